use std::fmt::Write as _;
use std::sync::Arc;

use packslip_core::config::LlmConfig;
use packslip_core::{format_weight, LedgerSummary, SalesOrder};
use tracing::{error, info};

use crate::llm::{HttpLlmClient, LlmClient};

pub const GENERATION_FAILED_MESSAGE: &str = "Error generating email. Please try again.";
pub const EMPTY_REPLY_MESSAGE: &str = "Could not generate email.";

/// Outcome of a drafting attempt. Failures carry a fixed, user-facing message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchEmail {
    Drafted(String),
    Failed(&'static str),
}

impl DispatchEmail {
    pub fn text(&self) -> &str {
        match self {
            Self::Drafted(text) => text,
            Self::Failed(message) => message,
        }
    }

    pub fn is_drafted(&self) -> bool {
        matches!(self, Self::Drafted(_))
    }
}

/// Builds the text-generation request for a dispatch notification.
pub fn dispatch_prompt(company: &str, order: &SalesOrder, summary: &LedgerSummary) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "You are a professional logistics manager for \"{company}\".");
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Write a polite, professional dispatch notification email to the customer.");
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Customer Details:");
    let _ = writeln!(prompt, "Name: {}", order.customer_name);
    let _ = writeln!(prompt, "Order ID: {}", order.order_id);
    if let Some(gst_number) = &order.gst_number {
        let _ = writeln!(prompt, "GST No: {gst_number}");
    }
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Order Summary:");
    let _ = writeln!(prompt, "Total Rolls: {}", summary.total_rolls);
    let _ = writeln!(prompt, "Total Weight: {} kg", format_weight(summary.grand_total));
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Products included:");
    for group in &summary.groups {
        let _ = writeln!(prompt, "- {} ({}): {} rolls", group.name, group.variant, group.quantity);
    }
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "The email should confirm the order is packed and ready for dispatch.");
    let _ = writeln!(prompt, "Keep it concise and business-professional.");
    let _ = write!(
        prompt,
        "Do not include placeholders like \"[Your Name]\", sign off as \"{company} Logistics Team\"."
    );
    prompt
}

pub struct DispatchDrafter {
    client: Arc<dyn LlmClient>,
    company: String,
}

impl DispatchDrafter {
    pub fn new(client: Arc<dyn LlmClient>, company: impl Into<String>) -> Self {
        Self { client, company: company.into() }
    }

    /// Builds the HTTP client for `llm` and drafts with it. A client that cannot be
    /// built, e.g. a hosted provider without an API key, yields the same fixed
    /// failure as a failed call.
    pub async fn draft_with_config(
        llm: &LlmConfig,
        company: &str,
        order: &SalesOrder,
        summary: &LedgerSummary,
    ) -> DispatchEmail {
        match HttpLlmClient::from_config(llm) {
            Ok(client) => Self::new(Arc::new(client), company).draft(order, summary).await,
            Err(err) => {
                error!(
                    event_name = "packslip.dispatch.client_unavailable",
                    order_id = %order.order_id,
                    provider = ?llm.provider,
                    error = %format!("{err:#}"),
                    "text generation client could not be built"
                );
                DispatchEmail::Failed(GENERATION_FAILED_MESSAGE)
            }
        }
    }

    /// Never fails: call errors and empty replies map to fixed messages.
    pub async fn draft(&self, order: &SalesOrder, summary: &LedgerSummary) -> DispatchEmail {
        let prompt = dispatch_prompt(&self.company, order, summary);

        match self.client.complete(&prompt).await {
            Ok(text) if text.is_empty() => {
                info!(
                    event_name = "packslip.dispatch.empty_reply",
                    order_id = %order.order_id,
                    "text generation returned no content"
                );
                DispatchEmail::Failed(EMPTY_REPLY_MESSAGE)
            }
            Ok(text) => {
                info!(
                    event_name = "packslip.dispatch.drafted",
                    order_id = %order.order_id,
                    chars = text.len(),
                    "dispatch email drafted"
                );
                DispatchEmail::Drafted(text)
            }
            Err(err) => {
                error!(
                    event_name = "packslip.dispatch.failed",
                    order_id = %order.order_id,
                    error = %format!("{err:#}"),
                    "dispatch email generation failed"
                );
                DispatchEmail::Failed(GENERATION_FAILED_MESSAGE)
            }
        }
    }
}
