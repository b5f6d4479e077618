//! Backoff for review-host calls.
//!
//! Transient failures (5xx, rate limits, dropped connections) are retried
//! with a doubling delay; permanent ones surface at once. This applies to the
//! host only: version-control mutations are never retried this way.

use std::future::Future;
use std::time::Duration;

use super::error::GitHubApiError;

/// How many times, and how far apart, a transient failure is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    /// Ceiling for the doubled delay.
    pub max_delay: Duration,
}

impl RetryConfig {
    /// Three retries, 2s, 4s and 8s apart.
    pub const DEFAULT: Self = Self {
        max_retries: 3,
        initial_delay: Duration::from_secs(2),
        max_delay: Duration::from_secs(30),
    };

    /// Delay before retry number `retry` (0-based).
    pub fn delay_before(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Whether a call may be retried at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetryPolicy {
    #[default]
    RetryTransient,
    /// For calls that are not idempotent: a timed-out create may have succeeded.
    NoRetry,
}

/// Runs `call` until it succeeds, fails permanently, or runs out of retries.
pub async fn retry_with_backoff<T, F, Fut>(
    config: RetryConfig,
    policy: RetryPolicy,
    mut call: F,
) -> Result<T, GitHubApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GitHubApiError>>,
{
    let retries = match policy {
        RetryPolicy::RetryTransient => config.max_retries,
        RetryPolicy::NoRetry => 0,
    };

    let mut retry = 0;
    loop {
        let error = match call().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.kind.is_retriable() => return Err(e),
            Err(e) => e,
        };
        if retry >= retries {
            if retries > 0 {
                tracing::warn!(attempts = retry + 1, error = %error, "giving up on GitHub call");
            }
            return Err(error);
        }

        let delay = config.delay_before(retry);
        tracing::debug!(retry, ?delay, error = %error, "GitHub call failed, retrying");
        tokio::time::sleep(delay).await;
        retry += 1;
    }
}
