use std::fs;
use std::path::Path;

use chrono::Local;
use packslip_core::{ApplicationError, OrderDraft};

use crate::commands::CommandResult;

/// Prints a draft skeleton, or writes it when `output` is given.
pub fn run(output: Option<&Path>) -> CommandResult {
    let draft = OrderDraft::blank(Local::now().date_naive());
    let rendered = match toml::to_string_pretty(&draft) {
        Ok(rendered) => rendered,
        Err(error) => {
            return CommandResult::from_error(
                "new-order",
                &ApplicationError::Export(format!("could not serialize order draft: {error}")),
            );
        }
    };

    let Some(path) = output else {
        return CommandResult::raw(rendered);
    };

    if let Err(error) = fs::write(path, rendered) {
        return CommandResult::from_error(
            "new-order",
            &ApplicationError::Export(format!("could not write `{}`: {error}", path.display())),
        );
    }

    let order_id = draft.order_id.unwrap_or_default();
    CommandResult::success("new-order", format!("wrote order draft {order_id} to {}", path.display()))
}
