//! Retry with exponential backoff
//!
//! The Sheets API rate-limits writes per user and per project. Quota and
//! transient failures are retried; everything else fails on the first attempt.
//! Non-idempotent requests (appends, positional deletes) are only retried when
//! the backend rejected them outright, since a timed-out request may already
//! have been applied.

use log::warn;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Errors that know whether another attempt could succeed
pub trait RetryableError {
    fn is_retryable(&self) -> bool;

    /// The backend refused the request without applying it
    fn was_rejected(&self) -> bool {
        false
    }
}

/// Whether repeating a request can change the outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Idempotency {
    /// Reads and full overwrites: safe to repeat after any retryable failure
    Idempotent,
    /// Appends and positional deletes: repeat only after an outright rejection
    NonIdempotent,
}

/// Backoff parameters
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// Randomize each delay between 50% and 100% of its nominal value
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Patient settings for shared spreadsheets that regularly hit quota
    pub fn conservative() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(64),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }

    /// Nominal delay before attempt `attempt + 1` (attempt is 1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let nominal = self.base_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped = nominal.min(self.max_delay.as_secs_f64()).max(0.0);
        Duration::from_secs_f64(capped)
    }
}

/// Executes async operations under a [`RetryConfig`]
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run an idempotent `op` until it succeeds, fails with a non-retryable error, or attempts run out
    pub async fn execute<T, E, F, Fut>(&self, label: &str, op: F) -> Result<T, E>
    where
        E: RetryableError + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with(label, Idempotency::Idempotent, op).await
    }

    /// Like [`execute`](Self::execute), retrying non-idempotent requests only after rejections
    pub async fn execute_with<T, E, F, Fut>(
        &self,
        label: &str,
        idempotency: Idempotency,
        mut op: F,
    ) -> Result<T, E>
    where
        E: RetryableError + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        let should_retry = |err: &E| match idempotency {
            Idempotency::Idempotent => err.is_retryable(),
            Idempotency::NonIdempotent => err.is_retryable() && err.was_rejected(),
        };

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if should_retry(&err) && attempt < max_attempts => {
                    let delay = self.jittered(self.config.delay_for(attempt));
                    warn!(
                        "{} failed (attempt {}/{}): {} - retrying in {:?}",
                        label, attempt, max_attempts, err, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if !self.config.jitter || delay.is_zero() {
            return delay;
        }
        let factor: f64 = rand::rng().random_range(0.5..=1.0);
        delay.mul_f64(factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct TestError(bool);

    #[derive(Debug)]
    enum WriteError {
        Throttled,
        TimedOut,
    }

    impl std::fmt::Display for WriteError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl RetryableError for WriteError {
        fn is_retryable(&self) -> bool {
            true
        }

        fn was_rejected(&self) -> bool {
            matches!(self, WriteError::Throttled)
        }
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "test error (retryable: {})", self.0)
        }
    }

    impl RetryableError for TestError {
        fn is_retryable(&self) -> bool {
            self.0
        }
    }

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    #[test]
    fn test_delay_growth_is_capped() {
        let config = RetryConfig {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            jitter: false,
        };
        assert_eq!(config.delay_for(1), Duration::from_millis(100));
        assert_eq!(config.delay_for(2), Duration::from_millis(200));
        assert_eq!(config.delay_for(3), Duration::from_millis(400));
        assert_eq!(config.delay_for(4), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let policy = RetryPolicy::new(fast_config(3));
        let calls = AtomicU32::new(0);

        let result: Result<u32, TestError> = policy
            .execute("op", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 { Err(TestError(true)) } else { Ok(n) }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let policy = RetryPolicy::new(fast_config(2));
        let calls = AtomicU32::new(0);

        let result: Result<(), TestError> = policy
            .execute("op", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError(true))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_immediately() {
        let policy = RetryPolicy::new(fast_config(5));
        let calls = AtomicU32::new(0);

        let result: Result<(), TestError> = policy
            .execute("op", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError(false))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_idempotent_retries_rejections_only() {
        let policy = RetryPolicy::new(fast_config(5));

        let calls = AtomicU32::new(0);
        let result: Result<(), WriteError> = policy
            .execute_with("append", Idempotency::NonIdempotent, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(WriteError::TimedOut)
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let calls = AtomicU32::new(0);
        let result: Result<u32, WriteError> = policy
            .execute_with("append", Idempotency::NonIdempotent, || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 { Err(WriteError::Throttled) } else { Ok(n) }
            })
            .await;
        assert_eq!(result.unwrap(), 3);
    }
}
