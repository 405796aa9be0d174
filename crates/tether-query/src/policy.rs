use std::error::Error;
use std::time::Duration;

use tether_config::QueryConfig;
use tether_core::ApiError;

/// Retry, freshness and refetch defaults shared by every query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPolicy {
    /// Retries allowed after the first failed attempt
    pub retry: u32,
    /// How long fetched data is served without refetching
    pub stale_time: Duration,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
    /// Invalidate everything when the application regains focus
    pub refetch_on_focus: bool,
}

impl Default for QueryPolicy {
    fn default() -> Self {
        Self::from(&QueryConfig::default())
    }
}

impl From<&QueryConfig> for QueryPolicy {
    fn from(config: &QueryConfig) -> Self {
        Self {
            retry: config.retry,
            stale_time: config.stale_time,
            retry_base_delay: config.retry_base_delay,
            retry_max_delay: config.retry_max_delay,
            refetch_on_focus: config.refetch_on_focus,
        }
    }
}

impl QueryPolicy {
    /// Same policy with retries sent back to back
    #[must_use]
    pub const fn without_retry_delay(mut self) -> Self {
        self.retry_base_delay = Duration::ZERO;
        self.retry_max_delay = Duration::ZERO;
        self
    }

    /// Decide whether to try again after a failed attempt
    ///
    /// `failure_count` is the number of failures before this one. Client
    /// errors (4xx) are never retried; anything else, including errors
    /// that are not an [`ApiError`], is retried while
    /// `failure_count < retry`.
    pub fn should_retry(&self, failure_count: u32, error: &(dyn Error + 'static)) -> bool {
        if let Some(api) = error.downcast_ref::<ApiError>()
            && api.is_client_error()
        {
            return false;
        }

        failure_count < self.retry
    }

    /// Wait before the next attempt: `base * 2^failure_count`, capped
    pub fn retry_delay(&self, failure_count: u32) -> Duration {
        let factor = 2_u32.checked_pow(failure_count).unwrap_or(u32::MAX);
        self.retry_base_delay.saturating_mul(factor).min(self.retry_max_delay)
    }
}
