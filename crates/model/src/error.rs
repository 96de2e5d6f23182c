/// Error taxonomy shared across every pipeline stage. Each stage catches
/// its own errors and records one of these in its result; the orchestrator
/// never propagates a stage error as a panic or an early return out of
/// `run()` — see `mnemo-pipeline`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExtractionError {
    /// Model response could not be stripped and parsed to the expected JSON
    /// shape. Carries the raw text, truncated for logs.
    #[error("LLM output could not be parsed as JSON: {truncated_raw}")]
    LLMOutput { truncated_raw: String },

    /// Network/timeout/rate-limit failure reaching the LLM or embedding
    /// provider. Retry-eligible.
    #[error("LLM/embedding transport error: {message}")]
    LLMTransport { message: String },

    /// Graph or archive connection lost / query rejected. Retry-eligible.
    #[error("store transport error: {message}")]
    StoreTransport { message: String },

    /// Parsed structure is missing a required field or otherwise violates
    /// the schema contract (e.g. a decision without `decision_reason`).
    #[error("schema validation failed: {message}")]
    SchemaValidation { message: String },

    /// A structural invariant was about to be violated (self semantic
    /// edge, duplicate primary key, orphan proposition).
    #[error("invariant violation: {message}")]
    InvariantViolation { message: String },
}

impl ExtractionError {
    /// Whether this error class is a candidate for bounded retry with
    /// exponential backoff. `LLMOutput` and `SchemaValidation` are never
    /// retried — the prompt contract is considered violated.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExtractionError::LLMTransport { .. } | ExtractionError::StoreTransport { .. }
        )
    }

    /// Truncates raw model output to a log-safe length before it is
    /// wrapped in `LLMOutput`.
    pub fn llm_output(raw: &str) -> Self {
        const MAX_LOGGED_CHARS: usize = 500;
        let truncated_raw: String = raw.chars().take(MAX_LOGGED_CHARS).collect();
        ExtractionError::LLMOutput { truncated_raw }
    }
}
