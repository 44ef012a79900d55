//! Retry with bounded exponential backoff.
//!
//! Only 429 (rate limited) and 503 (unavailable) are retried. Every other
//! status of 400 or above is returned as `Error::Http` on the first attempt.
//! Connection-level failures are not retried either.

use std::time::Duration;

use tracing::debug;

use super::transport::{ApiRequest, ApiResponse, Transport};
use super::RemoteClient;
use crate::error::{is_transient_status, Error, Result};

/// How many times to try a request and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Pause before the first retry; doubled for each following one.
    pub initial_backoff: Duration,
    /// Upper bound for a single pause.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Fresh backoff schedule for one request.
    #[must_use]
    pub fn backoff(&self) -> Backoff {
        Backoff {
            next: self.initial_backoff,
            max: self.max_backoff,
        }
    }
}

/// Doubling delay schedule, capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max: Duration,
}

impl Backoff {
    /// The delay to sleep now; advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next.min(self.max);
        self.next = delay.saturating_mul(2).min(self.max);
        delay
    }
}

impl<T: Transport> RemoteClient<T> {
    /// Execute `request`, retrying transient statuses per the retry policy.
    ///
    /// The backoff sleep suspends only the calling worker.
    ///
    /// # Errors
    ///
    /// Returns `Http` for a status of 400 or above once no retry applies,
    /// or `Request` if the connection itself fails.
    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let mut backoff = self.retry.backoff();
        let mut attempt = 1;

        loop {
            let response = self.transport.execute(request).await?;
            if response.is_success() {
                return Ok(response);
            }

            if is_transient_status(response.status) && attempt < self.retry.max_attempts {
                let delay = backoff.next_delay();
                debug!(
                    method = %request.method,
                    url = %request.url,
                    status = response.status,
                    attempt,
                    ?delay,
                    "Transient response, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            return Err(Error::Http {
                status: response.status,
                body: response.body,
            });
        }
    }
}
