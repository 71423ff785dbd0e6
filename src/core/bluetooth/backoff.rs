//! Retry and pacing policy for the gathering run.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::core::bluetooth::constants::{INTER_READ_DELAY, MAX_SCAN_ATTEMPTS};

/// Marker returned when the run's cancellation token fires inside a
/// suspension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupted;

/// Timing parameters governing one gathering run. The attempt budget and
/// the inter-read delay are fixed policy; the timeouts come from the CLI.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub retry_delay: Duration,
    pub scan_timeout: Duration,
    pub connection_timeout: Duration,
    pub inter_read_delay: Duration,
}

impl RetryPolicy {
    pub fn new(retry_delay: Duration, scan_timeout: Duration, connection_timeout: Duration) -> Self {
        Self {
            max_attempts: MAX_SCAN_ATTEMPTS,
            retry_delay,
            scan_timeout,
            connection_timeout,
            inter_read_delay: INTER_READ_DELAY,
        }
    }

    /// Whether another discovery attempt may follow `attempt` (zero-based).
    pub fn should_retry(&self, attempt: usize) -> bool {
        attempt + 1 < self.max_attempts
    }

    /// Suspends for the configured retry delay. Cancellation point.
    pub async fn wait_before_retry(&self, token: &CancellationToken) -> Result<(), Interrupted> {
        cancellable_sleep(self.retry_delay, token).await
    }
}

/// Sleeps for `duration` unless the token fires first.
pub async fn cancellable_sleep(
    duration: Duration,
    token: &CancellationToken,
) -> Result<(), Interrupted> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(Interrupted),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
