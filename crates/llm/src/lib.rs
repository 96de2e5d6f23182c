//! LLM client for the extraction pipeline: a provider-agnostic `complete`
//! contract plus the mandatory JSON-recovery step every stage runs its raw
//! completion through before parsing.
//!
//! Recovery is a strict sequential strip — trim whitespace, then peel a
//! leading ```json or ``` fence, then a trailing ``` — rather than a scan
//! for fences anywhere in the text. Models are consistent about where they
//! put fences; a scan risks eating legitimate backticks inside the JSON
//! payload itself.

mod json_recovery;
mod providers;
mod retry;

pub use json_recovery::recover_json;
pub use providers::{OllamaCompletionClient, OpenAiCompletionClient};
pub use retry::with_retry;

use async_trait::async_trait;
use mnemo_model::ExtractionError;

/// One model call: a single user-role prompt in, raw text out. Model
/// identity, temperature, and token cap are configuration, never arguments
/// threaded through call sites — see `mnemo-config::LlmConfig`.
#[async_trait]
pub trait LlmCompletion: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, ExtractionError>;
}

/// Parses a raw completion as JSON after running it through [`recover_json`].
/// This is the one path every Stage 1/Stage 2 caller should use — never
/// `serde_json::from_str` on the raw model text directly.
pub fn parse_llm_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, ExtractionError> {
    let cleaned = recover_json(raw);
    serde_json::from_str(&cleaned).map_err(|_| ExtractionError::llm_output(raw))
}
