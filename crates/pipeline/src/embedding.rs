//! The embedding service: a provider-agnostic batch operation the pipeline
//! submits one turn's proposition contents to as a single call.
//!
//! A local endpoint failing to respond is a fact of life for an
//! embedded-model deployment, so this degrades to a typed transport error
//! rather than panicking — the orchestrator treats a failed batch as zero
//! embeddings for the turn and moves on.

use async_trait::async_trait;
use mnemo_model::ExtractionError;

/// `embed_batch` is the primary path; `embed` is a convenience wrapper over
/// a single-element batch. Implementors must preserve the 1:1 input↔output
/// index mapping even if the underlying provider returns results out of
/// order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ExtractionError>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ExtractionError> {
        let mut batch = self.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        batch.pop().ok_or_else(|| ExtractionError::LLMTransport { message: "embedding provider returned an empty batch for a single input".to_string() })
    }
}

/// Calls an Ollama-compatible `/api/embeddings` endpoint once per text,
/// sequentially, collecting results in input order. Ollama has no native
/// batch-embeddings endpoint, so this is the batching contract's reference
/// implementation rather than a single bulk HTTP call.
pub struct OllamaEmbeddingProvider {
    client: reqwest::Client,
    model: String,
    url: String,
}

impl OllamaEmbeddingProvider {
    pub fn new(model: impl Into<String>, base_url: impl AsRef<str>, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("building the embedding HTTP client with static configuration cannot fail");
        let url = format!("{}/api/embeddings", base_url.as_ref().trim_end_matches('/'));
        Self { client, model: model.into(), url }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ExtractionError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            let body = serde_json::json!({ "model": self.model, "prompt": text });
            let response = self
                .client
                .post(&self.url)
                .json(&body)
                .send()
                .await
                .map_err(|e| ExtractionError::LLMTransport { message: format!("embedding request failed: {e}") })?;
            let json: serde_json::Value = response
                .json()
                .await
                .map_err(|e| ExtractionError::LLMTransport { message: format!("embedding response was not valid JSON: {e}") })?;
            let embedding: Vec<f32> = json["embedding"]
                .as_array()
                .ok_or_else(|| ExtractionError::LLMTransport { message: "embedding response missing the \"embedding\" array".to_string() })?
                .iter()
                .filter_map(|v| v.as_f64().map(|f| f as f32))
                .collect();
            if embedding.is_empty() {
                return Err(ExtractionError::LLMTransport { message: "embedding provider returned an empty vector".to_string() });
            }
            vectors.push(embedding);
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Deterministic stub for tests — one fixed-length vector per input,
    /// order-preserving, no network call.
    pub struct StubEmbeddingProvider {
        pub dimensions: usize,
        pub calls: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl EmbeddingProvider for StubEmbeddingProvider {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ExtractionError> {
            self.calls.lock().unwrap().push(texts.to_vec());
            Ok(texts.iter().map(|t| vec![t.len() as f32; self.dimensions]).collect())
        }
    }

    #[tokio::test]
    async fn embed_batch_preserves_order() {
        let provider = StubEmbeddingProvider { dimensions: 3, calls: Mutex::new(vec![]) };
        let texts = vec!["a".to_string(), "bb".to_string(), "ccc".to_string()];
        let vectors = provider.embed_batch(&texts).await.unwrap();
        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors[0], vec![1.0, 1.0, 1.0]);
        assert_eq!(vectors[2], vec![3.0, 3.0, 3.0]);
    }

    #[tokio::test]
    async fn embed_is_a_single_element_batch() {
        let provider = StubEmbeddingProvider { dimensions: 2, calls: Mutex::new(vec![]) };
        let vector = provider.embed("hi").await.unwrap();
        assert_eq!(vector, vec![2.0, 2.0]);
    }
}
