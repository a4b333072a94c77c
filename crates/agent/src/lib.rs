//! Narrative export: drafts a dispatch notification email with a text-generation
//! service.
//!
//! # Architecture
//!
//! 1. **Prompt** (`dispatch`) - order header, totals and product list rendered as text
//! 2. **Completion** (`llm`) - pluggable `LlmClient`, with an HTTP client for
//!    Gemini/OpenAI/Anthropic/Ollama
//! 3. **Outcome** - `DispatchEmail`, either the generated text verbatim or a fixed
//!    failure message
//!
//! The model only writes prose. Roll counts and weights are computed by the
//! ledger in `packslip-core` and passed in already formatted.

pub mod dispatch;
pub mod llm;

pub use dispatch::{
    dispatch_prompt, DispatchDrafter, DispatchEmail, EMPTY_REPLY_MESSAGE,
    GENERATION_FAILED_MESSAGE,
};
pub use llm::{HttpLlmClient, LlmClient};
