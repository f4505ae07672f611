use serde::Deserialize;
use std::time::Duration;

/// Rate store refresh configuration
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RateStoreConfig {
    /// Maximum number of stream rate requests in flight during one refresh
    /// Bounds the fan-out against large clusters regardless of node count
    /// Default: 200
    #[serde(default = "default_max_parallelism")]
    pub max_parallelism: usize,
    /// Deadline for a single node's stream rate request in milliseconds
    /// A node that misses it contributes nothing to the current refresh
    /// Default: 1000 (1 second)
    #[serde(default = "default_ingester_request_timeout")]
    pub ingester_request_timeout_ms: u64,
    /// Spacing between refreshes in milliseconds
    /// A refresh that overruns delays the next one, it never overlaps it
    /// Default: 1000 (1 second)
    #[serde(default = "default_stream_rate_update_interval")]
    pub stream_rate_update_interval_ms: u64,
}

impl RateStoreConfig {
    pub fn new(
        max_parallelism: usize,
        ingester_request_timeout: Duration,
        stream_rate_update_interval: Duration,
    ) -> Self {
        Self {
            max_parallelism,
            ingester_request_timeout_ms: duration_ms(ingester_request_timeout),
            stream_rate_update_interval_ms: duration_ms(stream_rate_update_interval),
        }
    }

    pub fn ingester_request_timeout(&self) -> Duration {
        Duration::from_millis(self.ingester_request_timeout_ms)
    }

    pub fn stream_rate_update_interval(&self) -> Duration {
        Duration::from_millis(self.stream_rate_update_interval_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_parallelism == 0 {
            return Err("max_parallelism must be > 0".into());
        }
        if self.ingester_request_timeout_ms == 0 {
            return Err("ingester_request_timeout_ms must be > 0".into());
        }
        if self.stream_rate_update_interval_ms == 0 {
            return Err("stream_rate_update_interval_ms must be > 0".into());
        }
        Ok(())
    }
}

impl Default for RateStoreConfig {
    fn default() -> Self {
        Self {
            max_parallelism: default_max_parallelism(),
            ingester_request_timeout_ms: default_ingester_request_timeout(),
            stream_rate_update_interval_ms: default_stream_rate_update_interval(),
        }
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn default_max_parallelism() -> usize {
    200
}

fn default_ingester_request_timeout() -> u64 {
    1000
}

fn default_stream_rate_update_interval() -> u64 {
    1000
}
