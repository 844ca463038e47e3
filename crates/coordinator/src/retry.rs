//! Bounded retries of transient failures.

use std::{fmt::Display, future::Future, time::Duration};

/// The largest delay between two attempts, in milliseconds.
const MAX_DELAY_MS: u64 = 30_000;

/// A policy retrying transient failures of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retry {
    /// Maximum number of retries after the first attempt. None retries until success.
    pub max_retries: Option<usize>,
    /// The delay before the first retry, in milliseconds.
    pub initial_delay_ms: u64,
    /// Whether the delay doubles after each retry.
    pub exponential_backoff: bool,
}

impl Default for Retry {
    fn default() -> Self {
        Self { max_retries: Some(3), initial_delay_ms: 100, exponential_backoff: true }
    }
}

impl Retry {
    /// Returns a new [`Retry`].
    pub const fn new(
        max_retries: Option<usize>,
        initial_delay_ms: u64,
        exponential_backoff: bool,
    ) -> Self {
        Self { max_retries, initial_delay_ms, exponential_backoff }
    }

    /// A policy making a single attempt.
    pub const fn none() -> Self {
        Self::new(Some(0), 0, false)
    }

    /// Returns the delay before the provided retry, starting at 1.
    pub fn delay(&self, retry: usize) -> Duration {
        let delay_ms = if self.exponential_backoff {
            let exponent = u32::try_from(retry.saturating_sub(1)).unwrap_or(u32::MAX).min(16);
            self.initial_delay_ms.saturating_mul(1 << exponent)
        } else {
            self.initial_delay_ms
        };
        Duration::from_millis(delay_ms.min(MAX_DELAY_MS))
    }

    /// Runs `operation` until it succeeds or the retries are exhausted, returning the last error.
    pub async fn retry<F, Fut, T, E>(&self, operation_name: &str, operation: F) -> Result<T, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut retries: usize = 0;
        loop {
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };
            if self.max_retries.is_some_and(|max| retries >= max) {
                tracing::warn!(target: "settlement::coordinator", operation = operation_name, %error, attempts = retries + 1, "operation failed, giving up");
                return Err(error)
            }

            retries += 1;
            let delay = self.delay(retries);
            tracing::debug!(target: "settlement::coordinator", operation = operation_name, %error, retry = retries, ?delay, "operation failed, retrying");
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Retry;
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    // Returns an operation failing `failures` times before succeeding, counting its attempts.
    fn flaky(
        failures: usize,
        attempts: &AtomicUsize,
    ) -> impl Fn() -> std::future::Ready<Result<u64, String>> + '_ {
        move || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            let result =
                if attempt < failures { Err(format!("attempt {attempt} failed")) } else { Ok(42) };
            std::future::ready(result)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_success_after_failures() {
        let attempts = AtomicUsize::new(0);
        let result = Retry::new(Some(5), 10, false).retry("flaky", flaky(2, &attempts)).await;

        assert_eq!(result, Ok(42));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhausted() {
        let attempts = AtomicUsize::new(0);
        let result =
            Retry::new(Some(2), 10, true).retry("always failing", flaky(10, &attempts)).await;

        assert_eq!(result, Err("attempt 2 failed".to_string()));
        // 1 initial + 2 retries.
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_single_attempt() {
        let attempts = AtomicUsize::new(0);
        let result = Retry::none().retry("once", flaky(1, &attempts)).await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_delays() {
        let retry = Retry::new(None, 100, true);
        assert_eq!(retry.delay(1), Duration::from_millis(100));
        assert_eq!(retry.delay(2), Duration::from_millis(200));
        assert_eq!(retry.delay(4), Duration::from_millis(800));
        assert_eq!(retry.delay(1_000), Duration::from_secs(30));

        assert_eq!(Retry::new(None, 100, false).delay(5), Duration::from_millis(100));
    }
}
