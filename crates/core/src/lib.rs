//! Order model, roll expansion and weight ledger for packing slips.
//!
//! Everything here is synchronous and free of I/O apart from reading the
//! configuration file. Rendering and exports live in sibling crates and consume
//! [`LedgerSummary`] so they never recompute totals themselves.

pub mod config;
pub mod domain;
pub mod errors;
pub mod ledger;
pub mod session;

pub use domain::order::{DraftLine, OrderDraft, OrderId, ProductLine, ProductLineId, SalesOrder};
pub use domain::roll::{expand, RollRecord};
pub use errors::{ApplicationError, DomainError, LedgerError};
pub use ledger::{
    format_weight, group_by_product, parse_weight, total_weight, GroupSummary, LedgerSummary,
    ProductGroup, RollSummary, WeightLedger,
};
pub use session::PackingSession;
