//! Retry utilities with fixed or exponential pauses between attempts.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::sources::SourceError;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Pause before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single pause
    pub max_delay: Duration,
    /// Multiplier applied to the pause after each retry (1.0 = fixed pause)
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// `max_attempts` attempts separated by the same `pause`
    pub fn fixed(max_attempts: u32, pause: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: pause,
            max_delay: pause,
            backoff_multiplier: 1.0,
        }
    }

    /// Set the maximum number of attempts
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the initial pause
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Pause before attempt number `attempt + 1` (attempts are 1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return self.initial_delay.min(self.max_delay);
        }
        let exp = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powf(attempt as f64 - 1.0);
        Duration::from_secs_f64(exp.min(self.max_delay.as_secs_f64()))
    }
}

/// Execute an async operation with retry logic
///
/// Errors for which [`SourceError::is_retryable`] is false are returned
/// immediately. After all attempts are exhausted the last error is returned.
pub async fn with_retry<T, F, Fut>(config: RetryConfig, operation: F) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    with_retry_if(config, || true, operation).await
}

/// Like [`with_retry`], but consults `keep_going` before every retry
///
/// When `keep_going` returns false (e.g. the caller's result is no longer
/// wanted) the last error is returned without pausing or retrying.
pub async fn with_retry_if<T, F, Fut, K>(
    config: RetryConfig,
    keep_going: K,
    operation: F,
) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
    K: Fn() -> bool,
{
    let mut attempts = 0;
    let mut operation = operation;

    loop {
        attempts += 1;

        match operation().await {
            Ok(result) => {
                if attempts > 1 {
                    tracing::info!(
                        "Operation succeeded on attempt {} after {} failures",
                        attempts,
                        attempts - 1
                    );
                }
                return Ok(result);
            }
            Err(error) => {
                if !error.is_retryable() {
                    return Err(error);
                }

                if attempts >= config.max_attempts {
                    tracing::warn!("Operation failed after {} attempts: {}", attempts, error);
                    return Err(error);
                }

                if !keep_going() {
                    tracing::debug!("Retry abandoned after attempt {}: {}", attempts, error);
                    return Err(error);
                }

                let delay = config.delay_after(attempts);
                tracing::debug!(
                    "Attempt {} failed: {}, retrying in {:?}",
                    attempts,
                    error,
                    delay
                );
                sleep(delay).await;
            }
        }
    }
}
