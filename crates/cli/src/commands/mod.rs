pub mod config;
pub mod email;
pub mod export;
pub mod input;
pub mod new_order;
pub mod slip;
pub mod summary;

use packslip_core::config::{AppConfig, LoadOptions};
use packslip_core::ApplicationError;
use serde::Serialize;

/// Exit code plus what the command prints to stdout.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Serialize)]
struct Outcome<'a> {
    command: &'a str,
    status: &'a str,
    error_class: Option<&'a str>,
    message: &'a str,
}

impl Outcome<'_> {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"command":{:?},"status":"error","error_class":"serialization","message":""}}"#, self.command)
        })
    }
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let output = Outcome { command, status: "ok", error_class: None, message: &message }.to_json();
        Self { exit_code: 0, output }
    }

    pub fn failure(command: &str, error_class: &str, message: impl Into<String>, exit_code: u8) -> Self {
        let message = message.into();
        let output =
            Outcome { command, status: "error", error_class: Some(error_class), message: &message }.to_json();
        Self { exit_code, output }
    }

    pub fn from_error(command: &str, error: &ApplicationError) -> Self {
        tracing::warn!(
            event_name = "packslip.cli.command_failed",
            command,
            error_class = error.error_class(),
            error = %error,
            "command failed"
        );
        Self::failure(command, error.error_class(), error.to_string(), error.exit_code())
    }

    /// Plain output for commands whose stdout is the artifact itself.
    pub fn raw(output: impl Into<String>) -> Self {
        Self { exit_code: 0, output: output.into() }
    }
}

pub(crate) fn load_config() -> Result<AppConfig, ApplicationError> {
    Ok(AppConfig::load(LoadOptions::default())?)
}

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, ApplicationError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| ApplicationError::Export(format!("failed to initialize async runtime: {error}")))
}
