//! Concrete `LlmCompletion` adapters for an Ollama-compatible local
//! endpoint and an OpenAI-compatible hosted one. Transport and HTTP-status
//! failures are surfaced as a typed `LLMTransportError` rather than a
//! human-readable placeholder string, so the orchestrator can retry or
//! short-circuit on them instead of parsing prose to find out what broke.

use async_trait::async_trait;
use mnemo_model::ExtractionError;
use serde_json::json;
use std::time::Duration;

use crate::LlmCompletion;
use crate::retry::with_retry;

/// Calls an Ollama-compatible `/api/generate` endpoint. Used as the local
/// default provider.
#[derive(Debug, Clone)]
pub struct OllamaCompletionClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
    retry_max_attempts: u32,
}

impl OllamaCompletionClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout: Duration, retry_max_attempts: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            timeout,
            retry_max_attempts,
        }
    }

    async fn call_once(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String, ExtractionError> {
        let endpoint = format!("{}/api/generate", self.base_url.trim_end_matches('/'));
        let payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": temperature,
                "num_predict": max_tokens,
            }
        });

        let response = self
            .client
            .post(&endpoint)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ExtractionError::LLMTransport { message: format!("ollama unreachable at {endpoint}: {e}") })?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ExtractionError::LLMTransport { message: format!("ollama response body: {e}") })?;

        if !status.is_success() {
            return Err(ExtractionError::LLMTransport { message: format!("ollama error ({status}): {body}") });
        }

        body.get("response")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| ExtractionError::LLMTransport { message: format!("ollama response missing text: {body}") })
    }
}

#[async_trait]
impl LlmCompletion for OllamaCompletionClient {
    async fn complete(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String, ExtractionError> {
        with_retry(self.retry_max_attempts, || self.call_once(prompt, max_tokens, temperature)).await
    }
}

/// Calls an OpenAI-compatible `/chat/completions` endpoint (OpenRouter and
/// similar hosted providers). Selected by configuration alongside
/// [`OllamaCompletionClient`]; the pipeline depends only on [`LlmCompletion`].
#[derive(Debug, Clone)]
pub struct OpenAiCompletionClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    timeout: Duration,
    retry_max_attempts: u32,
}

impl OpenAiCompletionClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
        retry_max_attempts: u32,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
            timeout,
            retry_max_attempts,
        }
    }

    async fn call_once(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String, ExtractionError> {
        let endpoint = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let payload = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": max_tokens,
            "temperature": temperature,
        });

        let response = self
            .client
            .post(&endpoint)
            .timeout(self.timeout)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ExtractionError::LLMTransport { message: format!("openai-compatible provider unreachable: {e}") })?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ExtractionError::LLMTransport { message: format!("openai-compatible response body: {e}") })?;

        if !status.is_success() {
            return Err(ExtractionError::LLMTransport { message: format!("openai-compatible error ({status}): {body}") });
        }

        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| ExtractionError::LLMTransport { message: format!("openai-compatible response missing text: {body}") })
    }
}

#[async_trait]
impl LlmCompletion for OpenAiCompletionClient {
    async fn complete(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String, ExtractionError> {
        with_retry(self.retry_max_attempts, || self.call_once(prompt, max_tokens, temperature)).await
    }
}
