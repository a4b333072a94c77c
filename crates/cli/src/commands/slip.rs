use std::fs;
use std::path::{Path, PathBuf};

use packslip_core::ApplicationError;
use packslip_documents::{slip_file_name, SlipFormat, SlipRenderer};

use crate::commands::input::LedgerInput;
use crate::commands::{load_config, runtime, CommandResult};

pub fn run(input: &LedgerInput, output: Option<&Path>, pdf: bool) -> CommandResult {
    match execute(input, output, pdf) {
        Ok(path) => {
            CommandResult::success("slip", format!("wrote packing slip to {}", path.display()))
        }
        Err(error) => CommandResult::from_error("slip", &error),
    }
}

fn execute(input: &LedgerInput, output: Option<&Path>, pdf: bool) -> Result<PathBuf, ApplicationError> {
    let config = load_config()?;
    let session = input.open_session()?;
    let summary = session.summary();
    let format = if pdf || config.export.pdf { SlipFormat::Pdf } else { SlipFormat::Html };

    let renderer = SlipRenderer::new().map_err(|error| ApplicationError::Export(error.to_string()))?;
    let rendered = runtime()?
        .block_on(renderer.render(&config.company, session.order(), &summary, format))
        .map_err(|error| ApplicationError::Export(error.to_string()))?;

    let path = match output {
        Some(path) => path.to_path_buf(),
        None => {
            fs::create_dir_all(&config.export.output_dir).map_err(|error| {
                ApplicationError::Export(format!(
                    "could not create `{}`: {error}",
                    config.export.output_dir.display()
                ))
            })?;
            config.export.output_dir.join(slip_file_name(session.order(), &rendered))
        }
    };

    fs::write(&path, rendered.into_bytes()).map_err(|error| {
        ApplicationError::Export(format!("could not write `{}`: {error}", path.display()))
    })?;

    tracing::info!(
        event_name = "packslip.export.slip_written",
        order_id = %session.order().order_id,
        path = %path.display(),
        "packing slip written"
    );

    Ok(path)
}
