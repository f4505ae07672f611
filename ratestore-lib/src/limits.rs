//! Per-tenant limits consulted by the rate store.
//!
//! The store only needs to know whether *any* tenant has stream sharding
//! enabled; the remaining fields are carried for the admission logic that
//! consumes the published rates.

use ahash::AHashMap;
use arc_swap::ArcSwap;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Stream sharding settings of a single tenant
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ShardStreamsConfig {
    /// Split high-volume streams into shards
    /// Default: false
    #[serde(default)]
    pub enabled: bool,
    /// Target per-shard rate in bytes/sec
    /// Default: 3145728 (3 MiB/s)
    #[serde(default = "default_desired_rate")]
    pub desired_rate: u64,
    /// Log every sharding decision
    /// Default: false
    #[serde(default)]
    pub logging_enabled: bool,
}

/// Limits of a single tenant
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct TenantLimits {
    #[serde(default)]
    pub shard_streams: ShardStreamsConfig,
}

fn default_desired_rate() -> u64 {
    3 << 20
}

/// Source of per-tenant limits
pub trait TenantOverrides: Send + Sync {
    /// Snapshot of the limits of every tenant with an explicit configuration
    fn all_by_tenant(&self) -> AHashMap<String, TenantLimits>;
}

/// Returns true if at least one tenant has stream sharding enabled.
///
/// Evaluated on every refresh so configuration changes take effect on the
/// next tick.
pub fn any_sharding_enabled(overrides: &dyn TenantOverrides) -> bool {
    overrides
        .all_by_tenant()
        .values()
        .any(|limits| limits.shard_streams.enabled)
}

/// In-memory tenant overrides that can be replaced at runtime
pub struct StaticOverrides {
    tenants: ArcSwap<AHashMap<String, TenantLimits>>,
}

impl StaticOverrides {
    pub fn new(tenants: HashMap<String, TenantLimits>) -> Self {
        Self { tenants: ArcSwap::from_pointee(tenants.into_iter().collect()) }
    }

    /// Replace the whole tenant set
    pub fn update(&self, tenants: HashMap<String, TenantLimits>) {
        self.tenants.store(Arc::new(tenants.into_iter().collect()));
    }
}

impl TenantOverrides for StaticOverrides {
    fn all_by_tenant(&self) -> AHashMap<String, TenantLimits> {
        self.tenants.load().as_ref().clone()
    }
}
