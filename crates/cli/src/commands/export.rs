use std::path::Path;

use packslip_core::ApplicationError;
use packslip_documents::WorkbookExporter;

use crate::commands::input::LedgerInput;
use crate::commands::{load_config, CommandResult};

pub fn run(input: &LedgerInput, output_dir: Option<&Path>) -> CommandResult {
    let result = load_config().and_then(|config| {
        let session = input.open_session()?;
        let exporter = WorkbookExporter::new(
            output_dir.map(Path::to_path_buf).unwrap_or_else(|| config.export.output_dir.clone()),
        );
        exporter
            .export(&config.company, session.order(), &session.summary())
            .map_err(|error| ApplicationError::Export(error.to_string()))
    });

    match result {
        Ok(path) => CommandResult::success("export", format!("wrote workbook to {}", path.display())),
        Err(error) => CommandResult::from_error("export", &error),
    }
}
