//! Packing slip documents: the printable slip (HTML, optionally PDF) and the
//! spreadsheet export. Both read a [`packslip_core::LedgerSummary`] and never
//! total weights themselves.

pub mod slip;
pub mod workbook;

pub use slip::{slip_file_name, RenderError, SlipFormat, SlipOutput, SlipRenderer};
pub use workbook::{
    export_file_name, packing_slip_rows, Cell, ExportError, SheetRow, WorkbookExporter,
};

/// Order id reduced to ASCII alphanumerics, everything else replaced with `_`.
pub fn safe_order_id(order_id: &str) -> String {
    order_id.chars().map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }).collect()
}
