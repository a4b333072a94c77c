use std::env;
use std::fs;
use std::path::PathBuf;

use packslip_core::config::{resolve_config_path, AppConfig, LoadOptions};
use packslip_core::ApplicationError;
use secrecy::ExposeSecret;
use toml::Value;

use crate::commands::CommandResult;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::from_error("config", &ApplicationError::from(error)),
    };
    let sources = Sources::discover();

    let api_key = match &config.llm.api_key {
        Some(key) => redact_secret(key.expose_secret()),
        None => "<unset>".to_string(),
    };

    let entries: [(&str, String, &[&str]); 11] = [
        ("company.name", config.company.name.clone(), &["PACKSLIP_COMPANY_NAME"][..]),
        ("company.tagline", config.company.tagline.clone(), &["PACKSLIP_COMPANY_TAGLINE"][..]),
        ("llm.provider", format!("{:?}", config.llm.provider), &["PACKSLIP_LLM_PROVIDER"][..]),
        ("llm.model", config.llm.model.clone(), &["PACKSLIP_LLM_MODEL"][..]),
        (
            "llm.base_url",
            config.llm.base_url.clone().unwrap_or_else(|| {
                format!("<default: {}>", config.llm.provider.default_base_url())
            }),
            &["PACKSLIP_LLM_BASE_URL"][..],
        ),
        ("llm.api_key", api_key, &["PACKSLIP_LLM_API_KEY", "API_KEY"][..]),
        ("llm.timeout_secs", config.llm.timeout_secs.to_string(), &["PACKSLIP_LLM_TIMEOUT_SECS"][..]),
        (
            "export.output_dir",
            config.export.output_dir.display().to_string(),
            &["PACKSLIP_EXPORT_OUTPUT_DIR"][..],
        ),
        ("export.pdf", config.export.pdf.to_string(), &["PACKSLIP_EXPORT_PDF"][..]),
        ("logging.level", config.logging.level.clone(), &["PACKSLIP_LOGGING_LEVEL", "PACKSLIP_LOG_LEVEL"][..]),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            &["PACKSLIP_LOGGING_FORMAT", "PACKSLIP_LOG_FORMAT"][..],
        ),
    ];

    let lines = entries
        .into_iter()
        .map(|(key, value, env_keys)| format!("- {key} = {value} (source: {})", sources.of(key, env_keys)));

    CommandResult::raw(
        std::iter::once("effective config (source precedence: env > file > default):".to_string())
            .chain(lines)
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

/// Where each effective value came from: an env var, the config file, or the default.
struct Sources {
    file: Option<(PathBuf, Value)>,
}

impl Sources {
    fn discover() -> Self {
        let file = resolve_config_path(None).and_then(|path| {
            let table = fs::read_to_string(&path).ok()?.parse::<Value>().ok()?;
            Some((path, table))
        });
        Self { file }
    }

    fn of(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }
        match &self.file {
            Some((path, table)) if has_key(table, key_path) => format!("file ({})", path.display()),
            _ => "default".to_string(),
        }
    }
}

fn has_key(table: &Value, key_path: &str) -> bool {
    key_path.split('.').try_fold(table, |node, key| node.get(key)).is_some()
}

fn redact_secret(secret: &str) -> String {
    let shown = if secret.trim().is_empty() { "<empty>" } else { "<redacted>" };
    shown.to_string()
}
