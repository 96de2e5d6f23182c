//! Bounded retry with exponential backoff for the two transport-class error
//! kinds (§7: `LLMTransportError`, `StoreTransportError`). `LLMOutputError`
//! and `SchemaValidationError` are never retried — callers simply don't run
//! those paths through this helper.

use std::future::Future;
use std::time::Duration;

use mnemo_model::ExtractionError;

/// Retries `op` up to `max_attempts` times with exponential backoff
/// (100ms, 200ms, 400ms, ...), but only when the returned error reports
/// [`ExtractionError::is_retryable`]. Non-retryable errors and the final
/// exhausted attempt are returned as-is.
pub async fn with_retry<F, Fut, T>(max_attempts: u32, mut op: F) -> Result<T, ExtractionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ExtractionError>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                let backoff = Duration::from_millis(100 * 2u64.pow(attempt - 1));
                tracing::warn!(attempt, max_attempts, error = %err, "retrying after transport error");
                tokio::time::sleep(backoff).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transport_errors_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry(3, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(ExtractionError::LLMTransport { message: "timeout".into() })
            } else {
                Ok(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_non_transport_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<i32, _> = with_retry(3, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ExtractionError::llm_output("not json"))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<i32, _> = with_retry(3, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ExtractionError::StoreTransport { message: "down".into() })
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
