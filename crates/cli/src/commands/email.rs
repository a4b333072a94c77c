use packslip_agent::{DispatchDrafter, DispatchEmail};
use packslip_core::ApplicationError;

use crate::commands::input::LedgerInput;
use crate::commands::{load_config, runtime, CommandResult};

/// Prints the drafted email verbatim. A failed draft, including a provider that
/// cannot be reached or authenticated, prints its fixed message and exits with
/// the export code.
pub fn run(input: &LedgerInput) -> CommandResult {
    match execute(input) {
        Ok(DispatchEmail::Drafted(text)) => CommandResult::raw(text),
        Ok(DispatchEmail::Failed(message)) => CommandResult::failure("email", "narrative_export", message, 4),
        Err(error) => CommandResult::from_error("email", &error),
    }
}

fn execute(input: &LedgerInput) -> Result<DispatchEmail, ApplicationError> {
    let config = load_config()?;
    let session = input.open_session()?;
    let summary = session.summary();

    Ok(runtime()?.block_on(DispatchDrafter::draft_with_config(
        &config.llm,
        &config.company.name,
        session.order(),
        &summary,
    )))
}
