//! Backoff for transient transport failures.
//!
//! Only transport clients use this, and only for reads. Adapters never retry
//! a mutation: a resubmitted transaction could land twice.

use std::{future::Future, time::Duration};

use rand::Rng;
use tracing::{debug, warn};

/// Lowercase fragments of error messages that indicate a transient failure.
const TRANSIENT_MARKERS: &[&str] = &[
    "connection",
    "timeout",
    "timed out",
    "rate limit",
    "too many requests",
    "429",
    "502",
    "503",
    "504",
    "temporarily unavailable",
    "reset by peer",
    "broken pipe",
    "eof",
];

pub fn is_transient_error(err: &eyre::Report) -> bool {
    let msg = format!("{err:#}").to_lowercase();
    TRANSIENT_MARKERS.iter().any(|marker| msg.contains(marker))
}

/// Exponential backoff with jitter.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub max_retries: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { initial_delay: Duration::from_millis(100), max_delay: Duration::from_secs(30), max_retries: 10 }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based), with up to 25% jitter.
    pub fn delay(&self, attempt: usize) -> Duration {
        let base = self.initial_delay.saturating_mul(1u32 << attempt.min(10)).min(self.max_delay);
        let jitter_ms = rand::thread_rng().gen_range(0..=base.as_millis() as u64 / 4);
        base + Duration::from_millis(jitter_ms)
    }

    /// Runs `f` until it succeeds, fails permanently, or retries run out.
    pub async fn run<F, Fut, T>(&self, operation: &str, mut f: F) -> eyre::Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = eyre::Result<T>>,
    {
        let mut attempt = 0;
        loop {
            let err = match f().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !is_transient_error(&err) {
                debug!(operation, error = %err, "Non-transient error, not retrying");
                return Err(err);
            }
            if attempt >= self.max_retries {
                warn!(operation, attempts = attempt, error = %err, "Max retries exceeded");
                return Err(err);
            }

            let delay = self.delay(attempt);
            warn!(
                operation,
                attempt = attempt + 1,
                max_attempts = self.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Transient transport error, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Runs `f` under the default [`RetryPolicy`].
pub async fn with_retry<F, Fut, T>(operation: &str, f: F) -> eyre::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = eyre::Result<T>>,
{
    RetryPolicy::default().run(operation, f).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast() -> RetryPolicy {
        RetryPolicy { initial_delay: Duration::from_millis(1), max_delay: Duration::from_millis(2), max_retries: 3 }
    }

    #[test]
    fn test_transient_classification() {
        assert!(is_transient_error(&eyre::eyre!("HTTP 503 Service Unavailable")));
        assert!(is_transient_error(&eyre::eyre!("connection reset by peer")));
        assert!(!is_transient_error(&eyre::eyre!("execution reverted: not ready")));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy::default();
        let delay = policy.delay(20);
        assert!(delay >= policy.max_delay);
        assert!(delay <= policy.max_delay + policy.max_delay / 4);
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = AtomicUsize::new(0);
        let value = fast()
            .run("read", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(eyre::eyre!("request timeout"))
                } else {
                    Ok(7)
                }
            })
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: eyre::Result<()> = fast()
            .run("read", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(eyre::eyre!("account not found"))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicUsize::new(0);
        let result: eyre::Result<()> = fast()
            .run("read", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(eyre::eyre!("429 too many requests"))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
