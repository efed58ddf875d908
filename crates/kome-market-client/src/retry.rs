//! Exponential backoff for marketplace HTTP calls.
//!
//! Only transport errors (connection refused, timeouts) are retried. Any
//! response, including a 5xx, is handed back to the caller to classify.

use std::time::Duration;

/// Retries after the initial attempt.
const MAX_RETRIES: u32 = 3;

/// First delay; doubles on each retry (200ms, 400ms, 800ms).
const BASE_DELAY_MS: u64 = 200;

pub(crate) async fn retry_send<F, Fut>(endpoint: &str, f: F) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    for attempt in 0..MAX_RETRIES {
        match f().await {
            Ok(resp) => return Ok(resp),
            Err(e) => {
                let delay = Duration::from_millis(BASE_DELAY_MS * 2u64.pow(attempt));
                tracing::warn!(
                    endpoint,
                    attempt = attempt + 1,
                    max_retries = MAX_RETRIES,
                    "marketplace request failed, retrying in {delay:?}: {e}"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
    f().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap();

        let result = retry_send("GET /closed", || {
            counter.fetch_add(1, Ordering::SeqCst);
            // Port 1 is never listening.
            http.get("http://127.0.0.1:1/").send()
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_RETRIES + 1);
    }
}
