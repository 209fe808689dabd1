use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Long-poll and reconnect tuning for the watch loop
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WatchConfig {
    /// How long the backend may hold a listing request open (unit: seconds)
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,

    /// Pause between liveness probes while the backend is unreachable
    /// (unit: seconds)
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,

    /// Upper bound of subscriber callbacks running at the same time
    #[serde(default = "default_max_concurrent_callbacks")]
    pub max_concurrent_callbacks: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            wait_timeout_secs: default_wait_timeout_secs(),
            retry_interval_secs: default_retry_interval_secs(),
            max_concurrent_callbacks: default_max_concurrent_callbacks(),
        }
    }
}

impl WatchConfig {
    pub(super) fn validate(&self) -> Result<()> {
        if self.wait_timeout_secs == 0 {
            return Err(Error::InvalidConfig("watch.wait_timeout_secs cannot be 0".into()));
        }

        if self.retry_interval_secs == 0 {
            return Err(Error::InvalidConfig(
                "watch.retry_interval_secs cannot be 0".into(),
            ));
        }

        if self.max_concurrent_callbacks == 0 {
            return Err(Error::InvalidConfig(
                "watch.max_concurrent_callbacks must be > 0".into(),
            ));
        }

        Ok(())
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }
}

fn default_wait_timeout_secs() -> u64 {
    30
}
fn default_retry_interval_secs() -> u64 {
    5
}
fn default_max_concurrent_callbacks() -> usize {
    64
}
