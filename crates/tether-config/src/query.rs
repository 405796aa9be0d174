use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Defaults applied to every query and mutation
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryConfig {
    /// Maximum number of retries after the first failed attempt
    #[serde(default = "default_retry")]
    pub retry: u32,

    /// How long fetched data counts as fresh
    #[serde(default = "default_stale_time", deserialize_with = "deserialize_duration")]
    pub stale_time: Duration,

    /// Delay before the first retry; doubled on every further attempt
    #[serde(default = "default_retry_base_delay", deserialize_with = "deserialize_duration")]
    pub retry_base_delay: Duration,

    /// Upper bound for the retry delay
    #[serde(default = "default_retry_max_delay", deserialize_with = "deserialize_duration")]
    pub retry_max_delay: Duration,

    /// Invalidate cached queries when the application regains focus
    #[serde(default)]
    pub refetch_on_focus: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            retry: default_retry(),
            stale_time: default_stale_time(),
            retry_base_delay: default_retry_base_delay(),
            retry_max_delay: default_retry_max_delay(),
            refetch_on_focus: false,
        }
    }
}

const fn default_retry() -> u32 {
    3
}

const fn default_stale_time() -> Duration {
    Duration::from_secs(5 * 60)
}

const fn default_retry_base_delay() -> Duration {
    Duration::from_secs(1)
}

const fn default_retry_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    duration_str::parse(&raw).map_err(|e| serde::de::Error::custom(format!("invalid duration '{raw}': {e}")))
}
