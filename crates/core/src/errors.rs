use thiserror::Error;

use crate::config::ConfigError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("required field `{field}` is missing")]
    MissingField { field: String },
    #[error("order must contain at least one product line")]
    EmptyOrder,
    #[error("product line `{line}` has invalid quantity {quantity} (expected at least 1 roll)")]
    InvalidQuantity { line: String, quantity: i64 },
    #[error("product line id `{0}` appears more than once")]
    DuplicateProductId(String),
    #[error("invalid order date `{0}` (expected YYYY-MM-DD)")]
    InvalidOrderDate(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("roll position {index} is out of range for a ledger of {len} rolls")]
    IndexOutOfRange { index: i64, len: usize },
}

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Configuration(#[from] ConfigError),
    #[error("input failure: {0}")]
    Input(String),
    #[error("export failure: {0}")]
    Export(String),
}

impl ApplicationError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(_) => "order_validation",
            Self::Ledger(_) => "ledger_index",
            Self::Configuration(_) => "config_validation",
            Self::Input(_) => "input",
            Self::Export(_) => "export",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Configuration(_) => 2,
            Self::Domain(_) | Self::Ledger(_) | Self::Input(_) => 3,
            Self::Export(_) => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ConfigError;
    use crate::errors::{ApplicationError, DomainError, LedgerError};

    #[test]
    fn order_validation_errors_map_to_invalid_input_exit_code() {
        let error = ApplicationError::from(DomainError::EmptyOrder);

        assert_eq!(error.error_class(), "order_validation");
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn ledger_errors_keep_position_and_length_in_message() {
        let error = ApplicationError::from(LedgerError::IndexOutOfRange { index: -1, len: 3 });

        assert_eq!(error.error_class(), "ledger_index");
        assert_eq!(error.to_string(), "roll position -1 is out of range for a ledger of 3 rolls");
    }

    #[test]
    fn configuration_errors_use_config_exit_code() {
        let error =
            ApplicationError::from(ConfigError::Validation("llm.timeout_secs".to_string()));

        assert_eq!(error.error_class(), "config_validation");
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn export_errors_use_export_exit_code() {
        assert_eq!(ApplicationError::Export("disk full".to_string()).exit_code(), 4);
    }
}
