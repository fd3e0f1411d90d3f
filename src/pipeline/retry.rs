//! Retrying transient failures.

use std::time::Duration;

use async_trait::async_trait;

use super::{is_retryable_status, ApiRequest, ApiResponse, Next, Stage};
use crate::config::HaloClientOptions;
use crate::error::HaloError;

/// How many times to retry and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retry_attempts: u32,
    /// Base delay.
    pub retry_delay: Duration,
    /// Upper bound on any single delay.
    pub max_retry_delay: Duration,
    /// Double the delay on every retry.
    pub use_exponential_backoff: bool,
}

impl RetryPolicy {
    /// Takes the retry settings from client options.
    pub fn from_options(options: &HaloClientOptions) -> Self {
        Self {
            max_retry_attempts: options.max_retry_attempts(),
            retry_delay: options.retry_delay(),
            max_retry_delay: options.max_retry_delay(),
            use_exponential_backoff: options.use_exponential_backoff(),
        }
    }

    /// Delay before retry `n`, counting from 1.
    ///
    /// Constant `retry_delay` without backoff, otherwise
    /// `min(retry_delay * 2^(n-1), max_retry_delay)`.
    pub fn delay_for(&self, n: u32) -> Duration {
        if !self.use_exponential_backoff {
            return self.retry_delay;
        }
        let factor = 2u32.checked_pow(n.saturating_sub(1)).unwrap_or(u32::MAX);
        self.retry_delay
            .checked_mul(factor)
            .map_or(self.max_retry_delay, |d| d.min(self.max_retry_delay))
    }
}

/// Re-sends requests that failed transiently.
///
/// A response with status 429 or 5xx, a timeout, or a connection failure is
/// retried up to `max_retry_attempts` times. Everything else, and the last
/// failure once attempts run out, is returned unchanged. Cancellation is
/// never retried.
#[derive(Debug, Clone)]
pub struct RetryStage {
    policy: RetryPolicy,
}

impl RetryStage {
    /// Creates the stage.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Stage for RetryStage {
    async fn handle(&self, request: ApiRequest, next: Next<'_>) -> Result<ApiResponse, HaloError> {
        let mut retries = 0u32;

        loop {
            let outcome = next.run(request.clone()).await;

            let reason = match &outcome {
                Ok(response) if is_retryable_status(response.status()) => {
                    Some(format!("HTTP {}", response.status().as_u16()))
                }
                Err(e) if e.is_retryable() => Some(e.to_string()),
                _ => None,
            };
            let Some(reason) = reason else {
                return outcome;
            };

            if retries >= self.policy.max_retry_attempts {
                if retries > 0 {
                    tracing::debug!(
                        request_id = %request.context.correlation_id(),
                        attempts = retries + 1,
                        "Retries exhausted"
                    );
                }
                return outcome;
            }

            retries += 1;
            let delay = self.policy.delay_for(retries);
            tracing::warn!(
                request_id = %request.context.correlation_id(),
                method = %request.method,
                uri = %request.url,
                attempt = retries,
                max_attempts = self.policy.max_retry_attempts,
                delay_ms = delay.as_millis() as u64,
                reason = %reason,
                "Retrying after transient failure"
            );

            tokio::select! {
                biased;
                _ = request.context.cancellation().cancelled() => return Err(HaloError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
