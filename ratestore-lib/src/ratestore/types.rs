use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::ring::NodeAddr;

/// Rate a node observes for one shard of a stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRate {
    /// Identity of this shard of the stream
    pub stream_hash: u64,
    /// Identity of the stream regardless of sharding
    pub stream_hash_no_shard: u64,
    /// Observed rate, bytes/sec
    pub rate: i64,
    /// Owning tenant, if the node reports it
    #[serde(default)]
    pub tenant: String,
}

impl StreamRate {
    pub fn new(stream_hash: u64, stream_hash_no_shard: u64, rate: i64) -> Self {
        Self { stream_hash, stream_hash_no_shard, rate, tenant: String::new() }
    }
}

/// Everything one node returned during one refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeReport {
    pub addr: NodeAddr,
    pub rates: Vec<StreamRate>,
}

impl NodeReport {
    pub fn new(addr: impl Into<NodeAddr>, rates: Vec<StreamRate>) -> Self {
        Self { addr: addr.into(), rates }
    }
}

/// Aggregated rates of one refresh, keyed by `stream_hash_no_shard`
///
/// Never modified once published; the next refresh replaces it whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateSnapshot {
    rates: AHashMap<u64, i64>,
    shards: AHashMap<u64, usize>,
}

impl RateSnapshot {
    pub(crate) fn from_parts(rates: AHashMap<u64, i64>, shards: AHashMap<u64, usize>) -> Self {
        Self { rates, shards }
    }

    /// Aggregated rate of a stream, 0 if it was not reported
    #[inline]
    pub fn rate_for(&self, stream_hash_no_shard: u64) -> i64 {
        self.rates.get(&stream_hash_no_shard).copied().unwrap_or(0)
    }

    /// Highest number of shards a single node reported for the stream
    pub fn shard_count(&self, stream_hash_no_shard: u64) -> usize {
        self.shards.get(&stream_hash_no_shard).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, i64)> + '_ {
        self.rates.iter().map(|(k, v)| (*k, *v))
    }
}
