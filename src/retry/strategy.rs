// src/retry/strategy.rs

use crate::config::RetryConfig;
use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RetryStrategy {
    config: RetryConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    NoRetry,
}

impl RetryStrategy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Execute with custom retry decision logic
    pub async fn execute_with_decision<F, Fut, T, E>(
        &self,
        mut f: F,
        should_retry: impl Fn(&E) -> RetryDecision,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let error = match f().await {
                Ok(result) => return Ok(result),
                Err(error) => error,
            };

            if should_retry(&error) == RetryDecision::NoRetry {
                debug!("Error is non-retryable: {}", error);
                return Err(error);
            }

            if attempt >= self.config.max_attempts {
                warn!("Retry failed after {} attempts: {}", attempt, error);
                return Err(error);
            }

            let backoff = self.calculate_backoff(attempt);
            debug!(
                "Attempt {} failed: {}. Retrying in {:?}",
                attempt, error, backoff
            );

            sleep(backoff).await;
        }
    }

    /// Calculate exponential backoff with jitter
    fn calculate_backoff(&self, attempt: u32) -> Duration {
        let base = u64::try_from(self.config.backoff_base().as_millis()).unwrap_or(u64::MAX);
        let max = u64::try_from(self.config.backoff_max().as_millis()).unwrap_or(u64::MAX);

        // base * 2^(attempt - 1), capped
        let exponential = base.saturating_mul(2u64.saturating_pow(attempt - 1));
        let capped = exponential.min(max);

        // 0-25% jitter
        let jitter = (capped as f64 * rand::random::<f64>() * 0.25) as u64;

        Duration::from_millis(capped + jitter)
    }

    /// Whether a relay response status is worth another attempt
    pub fn is_retryable_status(status: StatusCode) -> RetryDecision {
        match status {
            StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => RetryDecision::Retry,
            s if s.is_server_error() => RetryDecision::Retry,
            _ => RetryDecision::NoRetry,
        }
    }
}
