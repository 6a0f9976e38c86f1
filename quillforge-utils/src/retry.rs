//! ABOUTME: Shared exponential-backoff retry helper (§4.10 Retry/Backoff)
//! ABOUTME: Full-jitter doubling; callers classify which errors are worth retrying

use quillforge_core::PipelineError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Full-jitter exponential backoff: `random(0, base * 2^attempt)`.
    fn delay_for(&self, attempt: u32) -> Duration {
        let cap = self.base_delay.as_millis() as u64 * (1u64 << attempt.min(20));
        let jittered = rand::thread_rng().gen_range(0..=cap.max(1));
        Duration::from_millis(jittered)
    }
}

/// Retry `op` according to `config`, consulting `is_retryable` to classify
/// failures. Never retries on authentication, schema, or cancellation errors
/// (§4.10) — callers encode that by returning `false` from `is_retryable` for
/// those variants.
///
/// `retry_after` lets the caller honor an upstream-suggested delay (§4.1) in
/// place of the computed backoff for that attempt.
pub async fn with_retry<T, F, Fut>(
    config: RetryConfig,
    mut is_retryable: impl FnMut(&PipelineError) -> bool,
    mut op: F,
) -> Result<T, PipelineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PipelineError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= config.max_retries || !is_retryable(&err) {
                    return Err(err);
                }
                let delay = config.delay_for(attempt);
                warn!(attempt, ?delay, %err, "retrying after transient failure");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Default classifier used by the LLM provider (§4.1): retry on transient
/// upstream failures and truncation, never on anything else.
#[must_use]
pub fn default_is_retryable(err: &PipelineError) -> bool {
    err.is_retryable()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_until_success() {
        let attempts = AtomicU32::new(0);
        let config = RetryConfig::new(3, Duration::from_millis(1));
        let result = with_retry(config, default_is_retryable, || async {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(PipelineError::UpstreamTransient {
                    message: "rate limited".into(),
                    source: None,
                })
            } else {
                Ok(42)
            }
        })
        .await
        .unwrap();
        assert_eq!(result, 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let config = RetryConfig::new(2, Duration::from_millis(1));
        let result: Result<(), _> = with_retry(config, default_is_retryable, || async {
            Err(PipelineError::UpstreamTransient {
                message: "still down".into(),
                source: None,
            })
        })
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn never_retries_auth_errors() {
        let attempts = AtomicU32::new(0);
        let config = RetryConfig::new(5, Duration::from_millis(1));
        let result: Result<(), _> = with_retry(config, default_is_retryable, || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(PipelineError::Auth {
                message: "bad key".into(),
            })
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
