//! Runtime configuration.
//!
//! Sources, lowest precedence first: built-in defaults, `packslip.toml` (or
//! `config/packslip.toml`, or an explicit path) with `${VAR}` interpolation,
//! `PACKSLIP_*` environment variables, then programmatic overrides.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_FILE_CANDIDATES: [&str; 2] = ["packslip.toml", "config/packslip.toml"];

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const MAX_LLM_TIMEOUT_SECS: u64 = 300;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub company: CompanyConfig,
    pub llm: LlmConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
}

/// Branding printed on slips, workbooks and the email sign-off.
#[derive(Clone, Debug)]
pub struct CompanyConfig {
    pub name: String,
    pub tagline: String,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

impl LlmConfig {
    pub fn endpoint(&self) -> &str {
        self.base_url.as_deref().unwrap_or_else(|| self.provider.default_base_url())
    }
}

#[derive(Clone, Debug)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
    pub pdf: bool,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Gemini,
    #[serde(alias = "openai")]
    OpenAi,
    Anthropic,
    Ollama,
}

impl LlmProvider {
    pub fn requires_api_key(self) -> bool {
        !matches!(self, Self::Ollama)
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Gemini => "https://generativelanguage.googleapis.com",
            Self::OpenAi => "https://api.openai.com",
            Self::Anthropic => "https://api.anthropic.com",
            Self::Ollama => "http://localhost:11434",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub company_name: Option<String>,
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub pdf: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("`{path}` is not valid config TOML: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("config file `{0}` does not exist")]
    MissingConfigFile(PathBuf),
    #[error("`${{{var}}}` is referenced in the config file but not set")]
    MissingEnvInterpolation { var: String },
    #[error("`${{` in the config file has no closing `}}`")]
    UnterminatedInterpolation,
    #[error("{key}=`{value}` cannot be parsed")]
    InvalidEnvOverride { key: String, value: String },
    #[error("invalid config: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            company: CompanyConfig {
                name: "Aeromesh Netting Solutions".to_string(),
                tagline: "Industrial & Commercial Netting".to_string(),
            },
            llm: LlmConfig {
                provider: LlmProvider::Gemini,
                api_key: None,
                base_url: None,
                model: "gemini-2.5-flash".to_string(),
                timeout_secs: 30,
            },
            export: ExportConfig { output_dir: PathBuf::from("."), pdf: false },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "openai" | "open_ai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected gemini|openai|anthropic|ollama)"
            ))),
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let LoadOptions { config_path, require_file, overrides } = options;
        let mut config = Self::default();

        match resolve_config_path(config_path.as_deref()) {
            Some(path) => config.merge_file(read_patch(&path)?),
            None if require_file => {
                return Err(ConfigError::MissingConfigFile(
                    config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_CANDIDATES[0])),
                ));
            }
            None => {}
        }

        config.merge_env()?;
        config.merge_overrides(overrides);
        config.validate()?;

        Ok(config)
    }

    fn merge_file(&mut self, patch: ConfigPatch) {
        let ConfigPatch { company, llm, export, logging } = patch;

        if let Some(company) = company {
            assign(&mut self.company.name, company.name);
            assign(&mut self.company.tagline, company.tagline);
        }
        if let Some(llm) = llm {
            assign(&mut self.llm.provider, llm.provider);
            assign_some(&mut self.llm.api_key, llm.api_key.map(SecretString::from));
            assign_some(&mut self.llm.base_url, llm.base_url);
            assign(&mut self.llm.model, llm.model);
            assign(&mut self.llm.timeout_secs, llm.timeout_secs);
        }
        if let Some(export) = export {
            assign(&mut self.export.output_dir, export.output_dir);
            assign(&mut self.export.pdf, export.pdf);
        }
        if let Some(logging) = logging {
            assign(&mut self.logging.level, logging.level);
            assign(&mut self.logging.format, logging.format);
        }
    }

    fn merge_env(&mut self) -> Result<(), ConfigError> {
        assign(&mut self.company.name, env_text(&["PACKSLIP_COMPANY_NAME"]));
        assign(&mut self.company.tagline, env_text(&["PACKSLIP_COMPANY_TAGLINE"]));

        assign(&mut self.llm.provider, env_parsed(&["PACKSLIP_LLM_PROVIDER"])?);
        assign_some(
            &mut self.llm.api_key,
            env_text(&["PACKSLIP_LLM_API_KEY", "API_KEY"]).map(SecretString::from),
        );
        assign_some(&mut self.llm.base_url, env_text(&["PACKSLIP_LLM_BASE_URL"]));
        assign(&mut self.llm.model, env_text(&["PACKSLIP_LLM_MODEL"]));
        assign(&mut self.llm.timeout_secs, env_parsed(&["PACKSLIP_LLM_TIMEOUT_SECS"])?);

        assign(&mut self.export.output_dir, env_text(&["PACKSLIP_EXPORT_OUTPUT_DIR"]).map(PathBuf::from));
        assign(&mut self.export.pdf, env_parsed(&["PACKSLIP_EXPORT_PDF"])?);

        assign(&mut self.logging.level, env_text(&["PACKSLIP_LOGGING_LEVEL", "PACKSLIP_LOG_LEVEL"]));
        assign(
            &mut self.logging.format,
            env_parsed(&["PACKSLIP_LOGGING_FORMAT", "PACKSLIP_LOG_FORMAT"])?,
        );

        Ok(())
    }

    fn merge_overrides(&mut self, overrides: ConfigOverrides) {
        assign(&mut self.company.name, overrides.company_name);
        assign(&mut self.logging.level, overrides.log_level);
        assign(&mut self.llm.provider, overrides.llm_provider);
        assign(&mut self.llm.model, overrides.llm_model);
        assign_some(&mut self.llm.api_key, overrides.llm_api_key.map(SecretString::from));
        assign_some(&mut self.llm.base_url, overrides.llm_base_url);
        assign(&mut self.export.output_dir, overrides.output_dir);
        assign(&mut self.export.pdf, overrides.pdf);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |message: &str| Err(ConfigError::Validation(message.to_string()));

        if self.company.name.trim().is_empty() {
            return fail("company.name must not be empty");
        }
        if !(1..=MAX_LLM_TIMEOUT_SECS).contains(&self.llm.timeout_secs) {
            return fail("llm.timeout_secs must be in range 1..=300");
        }
        if self.llm.model.trim().is_empty() {
            return fail("llm.model must not be empty");
        }
        if let Some(base_url) = &self.llm.base_url {
            if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                return fail("llm.base_url must start with http:// or https://");
            }
        }
        if !LOG_LEVELS.contains(&self.logging.level.trim().to_ascii_lowercase().as_str()) {
            return fail("logging.level must be one of trace|debug|info|warn|error");
        }

        Ok(())
    }
}

/// Checked when a text-generation client is actually built, so commands that never
/// call the provider work without credentials.
pub fn require_llm_credentials(llm: &LlmConfig) -> Result<(), ConfigError> {
    let has_key = llm.api_key.as_ref().is_some_and(|key| !key.expose_secret().trim().is_empty());
    if has_key || !llm.provider.requires_api_key() {
        return Ok(());
    }

    Err(ConfigError::Validation(format!(
        "llm.api_key is required for the {:?} provider (set PACKSLIP_LLM_API_KEY)",
        llm.provider
    )))
}

/// Explicit path if it exists, otherwise the first default candidate on disk.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    match explicit_path {
        Some(path) => path.exists().then(|| path.to_path_buf()),
        None => CONFIG_FILE_CANDIDATES.into_iter().map(PathBuf::from).find(|path| path.exists()),
    }
}

fn assign<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn assign_some<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

/// First non-blank value among `keys`, with the key it came from.
fn env_entry(keys: &[&'static str]) -> Option<(&'static str, String)> {
    keys.iter().find_map(|key| {
        env::var(key).ok().filter(|value| !value.trim().is_empty()).map(|value| (*key, value))
    })
}

fn env_text(keys: &[&'static str]) -> Option<String> {
    env_entry(keys).map(|(_, value)| value)
}

fn env_parsed<T: FromStr>(keys: &[&'static str]) -> Result<Option<T>, ConfigError> {
    let Some((key, value)) = env_entry(keys) else {
        return Ok(None);
    };

    value.trim().parse::<T>().map(Some).map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value,
    })
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    toml::from_str(&interpolate_env_vars(&raw)?)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

/// Replaces every `${VAR}` with the value of `VAR`; unset variables are an error.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        let end = tail.find('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        let var = &tail[..end];

        let value = env::var(var)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: var.to_string() })?;
        output.push_str(&value);
        rest = &tail[end + 1..];
    }

    output.push_str(rest);
    Ok(output)
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    company: Option<CompanyPatch>,
    llm: Option<LlmPatch>,
    export: Option<ExportPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct CompanyPatch {
    name: Option<String>,
    tagline: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ExportPatch {
    output_dir: Option<PathBuf>,
    pdf: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
