//! Printable packing slip.
//!
//! Slips are rendered to HTML from an embedded tera template. When PDF output is
//! requested and `wkhtmltopdf` is on `PATH`, the HTML is converted; otherwise, or
//! when conversion fails, the HTML itself is returned for browser printing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;

use packslip_core::config::CompanyConfig;
use packslip_core::{format_weight, LedgerSummary, SalesOrder};
use rust_decimal::Decimal;
use serde::Serialize;
use tera::{Context, Tera};
use tokio::process::Command;
use tracing::{debug, warn};

const SLIP_TEMPLATE: &str = "packing_slip.html.tera";

/// Register custom tera filters used by the slip template.
///
/// - `weight`: two-decimal weight, e.g. `summary.grand_total | weight`
pub fn register_template_filters(tera: &mut Tera) {
    tera.register_filter("weight", tera_weight_filter);
}

/// Accepts decimals serialized as strings as well as plain numbers; anything else is zero.
fn tera_weight_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let weight = match value {
        tera::Value::String(raw) => Decimal::from_str(raw).unwrap_or(Decimal::ZERO),
        tera::Value::Number(number) => {
            number.as_f64().and_then(Decimal::from_f64_retain).unwrap_or(Decimal::ZERO)
        }
        _ => Decimal::ZERO,
    };
    Ok(tera::Value::String(format_weight(weight)))
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("slip template failed: {0}")]
    Template(String),
    #[error("pdf conversion failed: {0}")]
    Conversion(String),
    #[error("slip io: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlipFormat {
    Html,
    Pdf,
}

pub enum SlipOutput {
    Pdf(Vec<u8>),
    Html(String),
}

impl SlipOutput {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf(_) => "pdf",
            Self::Html(_) => "html",
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Pdf(bytes) => bytes,
            Self::Html(html) => html.into_bytes(),
        }
    }
}

#[derive(Serialize)]
struct CompanyView<'a> {
    name: &'a str,
    tagline: &'a str,
}

#[derive(Clone, Debug)]
pub struct SlipRenderer {
    tera: Tera,
    wkhtmltopdf: Option<PathBuf>,
}

impl SlipRenderer {
    pub fn new() -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        register_template_filters(&mut tera);
        tera.autoescape_on(vec![".html.tera"]);
        tera.add_raw_template(SLIP_TEMPLATE, include_str!("../templates/packing_slip.html.tera"))
            .map_err(|e| RenderError::Template(e.to_string()))?;

        let wkhtmltopdf = which::which("wkhtmltopdf").ok();
        debug!(wkhtmltopdf = ?wkhtmltopdf, "slip renderer ready");

        Ok(Self { tera, wkhtmltopdf })
    }

    /// HTML for browser printing.
    pub fn render_html(
        &self,
        company: &CompanyConfig,
        order: &SalesOrder,
        summary: &LedgerSummary,
    ) -> Result<String, RenderError> {
        let mut context = Context::new();
        context.insert("company", &CompanyView { name: &company.name, tagline: &company.tagline });
        context.insert("order", order);
        context.insert("summary", summary);

        self.tera.render(SLIP_TEMPLATE, &context).map_err(|e| RenderError::Template(e.to_string()))
    }

    pub async fn render(
        &self,
        company: &CompanyConfig,
        order: &SalesOrder,
        summary: &LedgerSummary,
        format: SlipFormat,
    ) -> Result<SlipOutput, RenderError> {
        let html = self.render_html(company, order, summary)?;

        let wkhtmltopdf = match (format, &self.wkhtmltopdf) {
            (SlipFormat::Pdf, Some(path)) => path,
            (SlipFormat::Pdf, None) => {
                warn!(
                    event_name = "packslip.slip.pdf_unavailable",
                    order_id = %order.order_id,
                    "wkhtmltopdf is not on PATH, returning HTML"
                );
                return Ok(SlipOutput::Html(html));
            }
            (SlipFormat::Html, _) => return Ok(SlipOutput::Html(html)),
        };

        match print_to_pdf(wkhtmltopdf, &html).await {
            Ok(pdf) => Ok(SlipOutput::Pdf(pdf)),
            Err(error) => {
                warn!(
                    event_name = "packslip.slip.pdf_fallback",
                    order_id = %order.order_id,
                    error = %error,
                    "wkhtmltopdf conversion failed, returning HTML"
                );
                Ok(SlipOutput::Html(html))
            }
        }
    }
}

/// Scratch files for one conversion, removed when dropped.
struct ScratchPair {
    html: PathBuf,
    pdf: PathBuf,
}

impl ScratchPair {
    fn new() -> Self {
        let stem = format!("packslip_{}", uuid::Uuid::new_v4().simple());
        let dir = std::env::temp_dir();
        Self { html: dir.join(format!("{stem}.html")), pdf: dir.join(format!("{stem}.pdf")) }
    }
}

impl Drop for ScratchPair {
    fn drop(&mut self) {
        for path in [&self.html, &self.pdf] {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// A4 with 10mm margins on every side.
async fn print_to_pdf(wkhtmltopdf: &Path, html: &str) -> Result<Vec<u8>, RenderError> {
    let scratch = ScratchPair::new();
    tokio::fs::write(&scratch.html, html).await?;

    let mut command = Command::new(wkhtmltopdf);
    command.args(["--quiet", "--encoding", "utf-8", "--page-size", "A4"]);
    for side in ["top", "bottom", "left", "right"] {
        command.arg(format!("--margin-{side}")).arg("10mm");
    }
    let output = command
        .arg(&scratch.html)
        .arg(&scratch.pdf)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(RenderError::Conversion(format!(
            "wkhtmltopdf exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let pdf = tokio::fs::read(&scratch.pdf).await?;
    debug!(bytes = pdf.len(), "slip converted to pdf");
    Ok(pdf)
}

/// Slip file name, e.g. `PackingSlip_SO_2024_0001.html`.
pub fn slip_file_name(order: &SalesOrder, output: &SlipOutput) -> String {
    format!("PackingSlip_{}.{}", crate::safe_order_id(&order.order_id.0), output.extension())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use packslip_core::config::CompanyConfig;
    use packslip_core::{OrderId, ProductLine, ProductLineId, SalesOrder, WeightLedger};

    use super::{slip_file_name, SlipFormat, SlipOutput, SlipRenderer};

    fn company() -> CompanyConfig {
        CompanyConfig {
            name: "Aeromesh Netting Solutions".to_string(),
            tagline: "Industrial & Commercial Netting".to_string(),
        }
    }

    fn order(gst_number: Option<&str>) -> SalesOrder {
        SalesOrder {
            order_id: OrderId("SO-2024-0001".to_string()),
            customer_name: "Greenfield <Farms>".to_string(),
            gst_number: gst_number.map(str::to_string),
            customer_address: "12 Orchard Road\nNashik".to_string(),
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

    #[test]
    fn html_contains_header_groups_and_totals() {
        let renderer = SlipRenderer::new().expect("embedded template loads");
        let order = order(Some("29ABCDE1234F1Z5"));
        let mut ledger = WeightLedger::from_order(&order);
        ledger.set_weight(0, "10.5").expect("in range");
        ledger.set_weight(1, "bad").expect("in range");
        ledger.set_weight(2, "4").expect("in range");

        let html =
            renderer.render_html(&company(), &order, &ledger.summary()).expect("renders html");

        assert!(html.contains("SO-2024-0001"));
        assert!(html.contains("Date: 2024-05-17"));
        assert!(html.contains("GST: 29ABCDE1234F1Z5"));
        assert!(html.contains("Anti-Bird Net &mdash; 2 Rolls Total"));
        assert!(html.contains("Roll 2 of 2"));
        assert!(html.contains("14.50 kg"));
        assert!(html.contains(">bad<"));
        assert!(html.contains("Industrial &amp; Commercial Netting"));
    }

    #[test]
    fn user_text_is_escaped_and_gst_is_optional() {
        let renderer = SlipRenderer::new().expect("embedded template loads");
        let order = order(None);
        let html = renderer
            .render_html(&company(), &order, &WeightLedger::from_order(&order).summary())
            .expect("renders html");

        assert!(html.contains("Greenfield &lt;Farms&gt;"));
        assert!(!html.contains("GST:"));
        assert!(html.contains("0.00 kg"));
    }

    #[tokio::test]
    async fn pdf_request_without_converter_falls_back_to_html() {
        let mut renderer = SlipRenderer::new().expect("embedded template loads");
        renderer.wkhtmltopdf = None;
        let order = order(None);

        let output = renderer
            .render(&company(), &order, &WeightLedger::from_order(&order).summary(), SlipFormat::Pdf)
            .await
            .expect("render succeeds");

        assert!(matches!(output, SlipOutput::Html(ref html) if html.contains("SO-2024-0001")));
        assert_eq!(slip_file_name(&order, &output), "PackingSlip_SO_2024_0001.html");
    }

    #[tokio::test]
    async fn failed_conversion_falls_back_to_html() {
        let converter = std::path::Path::new("/bin/false");
        if !converter.exists() {
            return;
        }
        let mut renderer = SlipRenderer::new().expect("embedded template loads");
        renderer.wkhtmltopdf = Some(converter.to_path_buf());
        let order = order(None);

        let output = renderer
            .render(&company(), &order, &WeightLedger::from_order(&order).summary(), SlipFormat::Pdf)
            .await
            .expect("render succeeds");

        assert_eq!(output.extension(), "html");
    }
}
