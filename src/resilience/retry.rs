//! Retry policy implementation.

use crate::error::AwsError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first one.
    pub max_retries: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Add jitter to backoff.
    pub use_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(20),
            backoff_multiplier: 2.0,
            use_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with custom values.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Set the initial backoff duration.
    pub fn with_initial_backoff(mut self, duration: Duration) -> Self {
        self.initial_backoff = duration;
        self
    }

    /// Set the maximum backoff duration.
    pub fn with_max_backoff(mut self, duration: Duration) -> Self {
        self.max_backoff = duration;
        self
    }

    /// Set the backoff multiplier.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Enable or disable jitter.
    pub fn with_jitter(mut self, use_jitter: bool) -> Self {
        self.use_jitter = use_jitter;
        self
    }

    /// Create a no-retry configuration.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }
}

/// Retry policy that executes operations with exponential backoff.
///
/// Only errors for which [`AwsError::is_retryable`] holds are retried.
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a new retry policy with the given configuration.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Execute an operation with retry logic.
    ///
    /// `operation` is called once per attempt and must build a fresh request
    /// each time.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, AwsError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AwsError>>,
    {
        let mut attempt = 0;

        loop {
            match operation(attempt).await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!(attempt, "Operation succeeded after retry");
                    }
                    return Ok(result);
                }
                Err(error) => {
                    if !error.is_retryable() {
                        return Err(error);
                    }
                    if attempt >= self.config.max_retries {
                        if self.config.max_retries > 0 {
                            warn!(
                                attempt,
                                max_retries = self.config.max_retries,
                                error = %error,
                                "Operation failed after all retries"
                            );
                        }
                        return Err(error);
                    }

                    let backoff = self.calculate_backoff(attempt);
                    debug!(
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %error,
                        "Retrying operation after backoff"
                    );

                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Backoff before retry number `attempt + 1`.
    pub(crate) fn calculate_backoff(&self, attempt: u32) -> Duration {
        let base = self.config.initial_backoff.as_millis() as f64;
        let multiplied = base * self.config.backoff_multiplier.powi(attempt as i32);
        let capped = multiplied.min(self.config.max_backoff.as_millis() as f64);

        // Equal jitter: half fixed, half random.
        let final_ms = if self.config.use_jitter && capped > 0.0 {
            let jitter: f64 = rand::thread_rng().gen_range(0.0..=1.0);
            capped * (0.5 + jitter * 0.5)
        } else {
            capped
        };

        Duration::from_millis(final_ms as u64)
    }

    /// Get the retry configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{NetworkError, RequestError, TransportFault};
    use crate::request::Operation;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn reset_fault() -> AwsError {
        AwsError::Transport(TransportFault {
            operation: Operation::Get,
            resource: "b/k".into(),
            source: NetworkError::ConnectionReset {
                message: "reset".into(),
            },
        })
    }

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(
            RetryConfig::new(max_retries)
                .with_initial_backoff(Duration::from_millis(1))
                .with_jitter(false),
        )
    }

    #[test]
    fn test_default_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_backoff, Duration::from_millis(100));
        assert_eq!(config.max_backoff, Duration::from_secs(20));
        assert_eq!(config.backoff_multiplier, 2.0);
        assert!(config.use_jitter);
        assert_eq!(RetryConfig::no_retry().max_retries, 0);
    }

    #[test]
    fn test_backoff_calculation() {
        let config = RetryConfig::new(3)
            .with_initial_backoff(Duration::from_millis(100))
            .with_multiplier(2.0)
            .with_jitter(false);
        let policy = RetryPolicy::new(config);

        assert_eq!(policy.calculate_backoff(0), Duration::from_millis(100));
        assert_eq!(policy.calculate_backoff(1), Duration::from_millis(200));
        assert_eq!(policy.calculate_backoff(2), Duration::from_millis(400));
    }

    #[test]
    fn test_backoff_capped() {
        let config = RetryConfig::new(10)
            .with_initial_backoff(Duration::from_secs(1))
            .with_max_backoff(Duration::from_secs(5))
            .with_multiplier(10.0)
            .with_jitter(false);
        let policy = RetryPolicy::new(config);

        assert_eq!(policy.calculate_backoff(5), Duration::from_secs(5));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = RetryPolicy::new(RetryConfig::new(3));
        for _ in 0..100 {
            let backoff = policy.calculate_backoff(1);
            assert!(backoff >= Duration::from_millis(100));
            assert!(backoff <= Duration::from_millis(200));
        }
    }

    #[tokio::test]
    async fn test_retry_until_success() {
        let calls = &AtomicU32::new(0);
        let result = fast(3)
            .execute(move |_| async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(reset_fault())
                } else {
                    Ok(42)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_bounded() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), AwsError> = fast(2)
            .execute(move |_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(reset_fault())
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_fails_immediately() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), AwsError> = fast(3)
            .execute(move |_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RequestError::EmptyName { field: "bucket" }
                    .during(Operation::CreateBucket, "")
                    .into())
            })
            .await;
        assert!(result.unwrap_err().is_construction_fault());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attempt_number_is_passed() {
        let mut seen = Vec::new();
        let _: Result<(), AwsError> = fast(2)
            .execute(|attempt| {
                seen.push(attempt);
                async { Err(reset_fault()) }
            })
            .await;
        assert_eq!(seen, vec![0, 1, 2]);
    }
}
