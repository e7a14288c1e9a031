//! Opt-in re-submission after flood-control responses.
//!
//! [`crate::Bot`] never retries on its own. Callers that want to ride out
//! `429` responses wrap their call in [`retry_rate_limited`]; every other
//! error is returned as-is on the first attempt.

use std::future::Future;
use std::time::Duration;

use botapi::BotError;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Limits for [`retry_rate_limited`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Longest `retry_after` worth waiting for; a longer hint is returned to
    /// the caller instead.
    pub max_wait_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            max_wait_secs: 60,
        }
    }
}

impl RetryConfig {
    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}

/// Runs `call` until it returns something other than
/// [`BotError::RateLimited`], sleeping for the platform's `retry_after`
/// between attempts.
///
/// Stops early, returning the last error, when attempts run out or the hint
/// exceeds [`RetryConfig::max_wait`]. Cancelling `cancel` during a wait
/// returns [`BotError::Cancelled`].
pub async fn retry_rate_limited<T, F, Fut>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut call: F,
) -> Result<T, BotError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BotError>>,
{
    let mut attempt = 1;
    loop {
        let err = match call().await {
            Err(err @ BotError::RateLimited { .. }) => err,
            other => return other,
        };
        let retry_after = err.retry_after().unwrap_or_default();

        if attempt >= config.max_attempts {
            debug!(attempt, "retry attempts exhausted");
            return Err(err);
        }
        if retry_after > config.max_wait() {
            debug!(
                attempt,
                retry_after_secs = retry_after.as_secs(),
                "retry_after exceeds the configured maximum wait"
            );
            return Err(err);
        }

        warn!(
            attempt,
            retry_after_secs = retry_after.as_secs(),
            "rate limited; waiting before re-submitting"
        );
        tokio::select! {
            _ = cancel.cancelled() => return Err(BotError::Cancelled),
            _ = tokio::time::sleep(retry_after) => {}
        }
        attempt += 1;
    }
}
