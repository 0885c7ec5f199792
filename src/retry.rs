//! Backoff policy and the shared retry helper.
//!
//! The number of retries is per endpoint ([`RequestConfig::retry_count`]);
//! the delay curve is per executor ([`RetryConfig`]).
//!
//! [`RequestConfig::retry_count`]: crate::RequestConfig::retry_count

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::endpoint::EndpointType;
use crate::telemetry;
use crate::Result;

/// Capped exponential backoff between attempts.
///
/// ```rust
/// # use folio::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .initial_delay(Duration::from_millis(200))
///     .max_delay(Duration::from_secs(2));
/// assert_eq!(config.delay_for_attempt(1), Duration::from_millis(400));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Delay before the first retry. Default: 1s.
    pub initial_delay: Duration,
    /// Upper bound for any single delay. Default: 10s.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Delay before retry `attempt` (0-indexed): `initial_delay * 2^attempt`,
    /// capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        delay.min(self.max_delay)
    }

    /// Worst-case latency for an endpoint: every attempt times out and every
    /// backoff delay is taken.
    pub fn latency_bound(&self, timeout: Duration, retries: u32) -> Duration {
        let waits: Duration = (0..retries).map(|a| self.delay_for_attempt(a)).sum();
        timeout.saturating_mul(retries + 1) + waits
    }
}

/// Execute an async operation, retrying transient errors.
///
/// Makes at most `retries + 1` attempts. Errors that are not
/// [`FolioError::is_transient()`](crate::FolioError::is_transient) are returned
/// immediately.
pub async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    retries: u32,
    service: &str,
    endpoint: EndpointType,
    f: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() && attempt < retries => {
                let delay = config.delay_for_attempt(attempt);
                attempt += 1;
                metrics::counter!(telemetry::RETRIES_TOTAL,
                    "service" => service.to_owned(),
                    "endpoint" => endpoint.as_str(),
                )
                .increment(1);
                warn!(
                    service,
                    %endpoint,
                    attempt,
                    max_retries = retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying after transient error"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
