use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use packslip_core::{ApplicationError, OrderDraft, PackingSession, SalesOrder, WeightLedger};

/// Order file plus the weights to enter into its ledger.
#[derive(Debug, Clone, Default, Args)]
pub struct LedgerInput {
    #[arg(long, value_name = "FILE", help = "Order draft file (.toml or .json)")]
    pub order: PathBuf,
    #[arg(long, value_name = "FILE", help = "One weight per line, in ledger order")]
    pub weights: Option<PathBuf>,
    #[arg(
        long = "weight",
        value_name = "N=TEXT",
        allow_hyphen_values = true,
        help = "Set the weight at 0-based ledger position N (repeatable)"
    )]
    pub weight: Vec<String>,
}

impl LedgerInput {
    pub fn new(order: impl Into<PathBuf>) -> Self {
        Self { order: order.into(), ..Self::default() }
    }

    /// Opens a packing session for the order with every requested weight applied.
    /// Any bad position fails the whole input before the session is handed out.
    pub fn open_session(&self) -> Result<PackingSession, ApplicationError> {
        let order = load_order(&self.order)?;
        let mut session = PackingSession::open(Arc::new(order));

        if let Some(path) = &self.weights {
            apply_weights_file(session.ledger_mut(), path)?;
        }
        for assignment in &self.weight {
            let (position, text) = parse_assignment(assignment)?;
            session.ledger_mut().set_weight_at(position, text)?;
        }

        Ok(session)
    }
}

pub fn load_order(path: &Path) -> Result<SalesOrder, ApplicationError> {
    let raw = fs::read_to_string(path).map_err(|error| {
        ApplicationError::Input(format!("could not read order file `{}`: {error}", path.display()))
    })?;

    let draft: OrderDraft = if has_extension(path, "json") {
        serde_json::from_str(&raw).map_err(|error| {
            ApplicationError::Input(format!("could not parse order file `{}`: {error}", path.display()))
        })?
    } else {
        toml::from_str(&raw).map_err(|error| {
            ApplicationError::Input(format!("could not parse order file `{}`: {error}", path.display()))
        })?
    };

    Ok(draft.submit()?)
}

fn apply_weights_file(ledger: &mut WeightLedger, path: &Path) -> Result<(), ApplicationError> {
    let raw = fs::read_to_string(path).map_err(|error| {
        ApplicationError::Input(format!("could not read weights file `{}`: {error}", path.display()))
    })?;

    for (index, line) in weight_lines(&raw).into_iter().enumerate() {
        ledger.set_weight(index, line)?;
    }
    Ok(())
}

/// One entry per line. Interior blank lines stay as empty positions; blank lines
/// after the last entry are dropped.
fn weight_lines(raw: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = raw.lines().map(|line| line.trim_end_matches('\r')).collect();
    while lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }
    lines
}

fn parse_assignment(assignment: &str) -> Result<(i64, &str), ApplicationError> {
    let invalid = || {
        ApplicationError::Input(format!("invalid weight assignment `{assignment}` (expected N=TEXT)"))
    };

    let (position, text) = assignment.split_once('=').ok_or_else(invalid)?;
    let position = position.trim().parse::<i64>().map_err(|_| invalid())?;
    Ok((position, text))
}

fn has_extension(path: &Path, expected: &str) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case(expected))
}
