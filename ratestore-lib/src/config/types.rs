use serde::Deserialize;
use std::collections::HashMap;

use super::rate_store::RateStoreConfig;
use super::telemetry::{LoggingConfig, TelemetryConfig};
use crate::limits::TenantLimits;

/// Storage node known to the static membership
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    /// Node address (host:port format)
    /// Example: "ingester-0:3100"
    pub address: String,
    /// Whether the node is eligible to serve requests
    /// Unhealthy nodes are never polled
    /// Default: true
    #[serde(default = "default_true")]
    pub healthy: bool,
}

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// Refresh loop configuration
    #[serde(default)]
    pub rate_store: RateStoreConfig,
    /// Storage nodes to poll for stream rates
    /// Default: empty (every refresh sees an empty cluster)
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
    /// Per-tenant limits keyed by tenant id
    /// Polling only happens while at least one tenant enables stream sharding
    #[serde(default)]
    pub tenants: HashMap<String, TenantLimits>,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_true() -> bool {
    true
}
