use std::fmt::Write as _;

use packslip_core::{format_weight, ApplicationError, LedgerSummary, PackingSession};
use serde::Serialize;

use crate::commands::input::LedgerInput;
use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct SummaryReport<'a> {
    command: &'static str,
    status: &'static str,
    order_id: &'a str,
    total_rolls: usize,
    total_weight: String,
    summary: &'a LedgerSummary,
}

pub fn run(input: &LedgerInput, json: bool) -> CommandResult {
    match execute(input, json) {
        Ok(output) => CommandResult::raw(output),
        Err(error) => CommandResult::from_error("summary", &error),
    }
}

fn execute(input: &LedgerInput, json: bool) -> Result<String, ApplicationError> {
    let session = input.open_session()?;
    let summary = session.summary();

    if json {
        let report = SummaryReport {
            command: "summary",
            status: "ok",
            order_id: &session.order().order_id.0,
            total_rolls: summary.total_rolls,
            total_weight: summary.grand_total_display(),
            summary: &summary,
        };
        return serde_json::to_string(&report)
            .map_err(|error| ApplicationError::Export(format!("could not serialize summary: {error}")));
    }

    Ok(render_text(&session, &summary))
}

fn render_text(session: &PackingSession, summary: &LedgerSummary) -> String {
    let order = session.order();
    let mut text = String::new();
    let _ = writeln!(
        text,
        "order {} for {} ({})",
        order.order_id, order.customer_name, order.order_date
    );
    for group in &summary.groups {
        let _ = writeln!(
            text,
            "- {} ({}): {} rolls, subtotal {} kg",
            group.name,
            group.variant,
            group.quantity,
            format_weight(group.subtotal)
        );
    }
    let _ = writeln!(text, "total rolls: {}", summary.total_rolls);
    let _ = write!(text, "total net weight: {} kg", summary.grand_total_display());
    text
}
