//! Spreadsheet export of a packing slip.
//!
//! The layout is built as plain rows first ([`packing_slip_rows`]) so it can be
//! inspected without touching the xlsx writer.

use std::path::PathBuf;

use packslip_core::config::CompanyConfig;
use packslip_core::{LedgerSummary, SalesOrder};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Workbook, XlsxError};
use serde::Serialize;
use tracing::info;

pub const SHEET_NAME: &str = "Packing Slip";
const LABEL_COLUMN_WIDTH: f64 = 35.0;
const VALUE_COLUMN_WIDTH: f64 = 15.0;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("xlsx error: {0}")]
    Xlsx(#[from] XlsxError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Cell {
    Blank,
    Text(String),
    Number(Decimal),
}

impl Cell {
    fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }
}

/// One spreadsheet row: a label column and a value column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SheetRow {
    pub label: Cell,
    pub value: Cell,
}

impl SheetRow {
    fn blank() -> Self {
        Self { label: Cell::Blank, value: Cell::Blank }
    }

    fn title(label: impl Into<String>) -> Self {
        Self { label: Cell::text(label), value: Cell::Blank }
    }

    fn pair(label: impl Into<String>, value: Cell) -> Self {
        Self { label: Cell::text(label), value }
    }
}

pub fn packing_slip_rows(
    company: &CompanyConfig,
    order: &SalesOrder,
    summary: &LedgerSummary,
) -> Vec<SheetRow> {
    let mut rows = vec![
        SheetRow::title(company.name.clone()),
        SheetRow::title("PACKING SLIP"),
        SheetRow::blank(),
        SheetRow::pair("Order ID", Cell::text(order.order_id.to_string())),
        SheetRow::pair("Date", Cell::text(order.order_date.to_string())),
        SheetRow::pair("Customer Name", Cell::text(order.customer_name.clone())),
        SheetRow::pair("GST Number", Cell::text(order.gst_number.clone().unwrap_or_default())),
        SheetRow::pair("Address", Cell::text(order.customer_address.clone())),
        SheetRow::blank(),
    ];

    for group in &summary.groups {
        rows.push(SheetRow::pair(
            format!("{} - {}", group.name, group.variant),
            Cell::text(format!("Qty: {} Rolls", group.quantity)),
        ));
        rows.push(SheetRow::pair("Roll No.", Cell::text("Weight (kg)")));
        for roll in &group.rolls {
            rows.push(SheetRow {
                label: Cell::Number(Decimal::from(roll.roll_number)),
                value: Cell::Number(roll.weight),
            });
        }
        rows.push(SheetRow::pair("Subtotal", Cell::Number(group.subtotal)));
        rows.push(SheetRow::blank());
    }

    rows.push(SheetRow::pair("GRAND TOTAL WEIGHT", Cell::Number(summary.grand_total)));
    rows
}

/// `PackingSlip_<order id>.xlsx` with every non-alphanumeric character replaced.
pub fn export_file_name(order: &SalesOrder) -> String {
    format!("PackingSlip_{}.xlsx", crate::safe_order_id(&order.order_id.0))
}

#[derive(Clone, Debug)]
pub struct WorkbookExporter {
    output_dir: PathBuf,
}

impl WorkbookExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self { output_dir: output_dir.into() }
    }

    /// Writes the workbook and returns its path.
    pub fn export(
        &self,
        company: &CompanyConfig,
        order: &SalesOrder,
        summary: &LedgerSummary,
    ) -> Result<PathBuf, ExportError> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(export_file_name(order));
        let rows = packing_slip_rows(company, order, summary);

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(SHEET_NAME)?;
        worksheet.set_column_width(0, LABEL_COLUMN_WIDTH)?;
        worksheet.set_column_width(1, VALUE_COLUMN_WIDTH)?;

        for (row_index, row) in rows.iter().enumerate() {
            let row_num = u32::try_from(row_index).unwrap_or(u32::MAX);
            for (col, cell) in [(0u16, &row.label), (1u16, &row.value)] {
                match cell {
                    Cell::Blank => {}
                    Cell::Text(text) => {
                        worksheet.write_string(row_num, col, text.as_str())?;
                    }
                    Cell::Number(number) => {
                        worksheet.write_number(row_num, col, number.to_f64().unwrap_or_default())?;
                    }
                }
            }
        }

        workbook.save(&path)?;

        info!(
            event_name = "packslip.export.workbook_written",
            order_id = %order.order_id,
            rows = rows.len(),
            path = %path.display(),
            "packing slip workbook written"
        );

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use packslip_core::config::CompanyConfig;
    use packslip_core::{OrderId, ProductLine, ProductLineId, SalesOrder, WeightLedger};
    use rust_decimal::Decimal;

    use super::{export_file_name, packing_slip_rows, Cell, SheetRow, WorkbookExporter};

    fn company() -> CompanyConfig {
        CompanyConfig {
            name: "Aeromesh Netting Solutions".to_string(),
            tagline: "Industrial & Commercial Netting".to_string(),
        }
    }

    fn order(order_id: &str) -> SalesOrder {
        SalesOrder {
            order_id: OrderId(order_id.to_string()),
            customer_name: "Greenfield Farms".to_string(),
            gst_number: None,
            customer_address: "Nashik".to_string(),
            order_date: NaiveDate::from_ymd_opt(2024, 5, 17).expect("date"),
            lines: vec![
                ProductLine {
                    id: ProductLineId("a".to_string()),
                    name: "Anti-Bird Net".to_string(),
                    variant: "Green".to_string(),
                    quantity: 2,
                },
                ProductLine {
                    id: ProductLineId("b".to_string()),
                    name: "Shade Net".to_string(),
                    variant: "Black".to_string(),
                    quantity: 1,
                },
            ],
        }
    }

    fn text(value: &str) -> Cell {
        Cell::Text(value.to_string())
    }

    fn dec(raw: &str) -> Decimal {
        raw.parse().expect("decimal literal")
    }

    #[test]
    fn rows_follow_slip_layout() {
        let order = order("SO-2024-0001");
        let mut ledger = WeightLedger::from_order(&order);
        ledger.set_weight(0, "10.5").expect("in range");
        ledger.set_weight(1, "oops").expect("in range");
        ledger.set_weight(2, "4").expect("in range");

        let rows = packing_slip_rows(&company(), &order, &ledger.summary());

        assert_eq!(rows[0].label, text("Aeromesh Netting Solutions"));
        assert_eq!(rows[1].label, text("PACKING SLIP"));
        assert_eq!(rows[2], SheetRow { label: Cell::Blank, value: Cell::Blank });
        assert_eq!(rows[3].value, text("SO-2024-0001"));
        assert_eq!(rows[4].value, text("2024-05-17"));
        assert_eq!(rows[6], SheetRow { label: text("GST Number"), value: text("") });
        assert_eq!(rows[9].label, text("Anti-Bird Net - Green"));
        assert_eq!(rows[9].value, text("Qty: 2 Rolls"));
        assert_eq!(rows[10].label, text("Roll No."));
        assert_eq!(rows[11].value, Cell::Number(dec("10.5")));
        assert_eq!(rows[12].value, Cell::Number(Decimal::ZERO));
        assert_eq!(rows[13], SheetRow { label: text("Subtotal"), value: Cell::Number(dec("10.5")) });

        let last = rows.last().expect("grand total row");
        assert_eq!(last.label, text("GRAND TOTAL WEIGHT"));
        assert_eq!(last.value, Cell::Number(dec("14.5")));
        assert_eq!(rows.len(), 9 + 6 + 5 + 1);
    }

    #[test]
    fn file_name_replaces_unsafe_characters() {
        assert_eq!(export_file_name(&order("SO-2024-0001")), "PackingSlip_SO_2024_0001.xlsx");
        assert_eq!(export_file_name(&order("A/B ü.9")), "PackingSlip_A_B___9.xlsx");
    }

    #[test]
    fn export_writes_xlsx_into_output_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let exporter = WorkbookExporter::new(dir.path().join("exports"));
        let order = order("SO-2024-0001");

        let path = exporter
            .export(&company(), &order, &WeightLedger::from_order(&order).summary())
            .expect("workbook written");

        assert_eq!(path, dir.path().join("exports").join("PackingSlip_SO_2024_0001.xlsx"));
        let bytes = std::fs::read(&path).expect("read workbook");
        assert!(bytes.starts_with(b"PK"));
    }
}
