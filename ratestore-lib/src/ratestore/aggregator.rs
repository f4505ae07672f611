use ahash::{AHashMap, AHashSet};

use super::types::{NodeReport, RateSnapshot};

/// Figures about one aggregation, recorded as metrics by the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateStats {
    /// Logical streams in the snapshot
    pub streams: usize,
    /// Highest aggregated rate of any stream
    pub max_stream_rate: i64,
    /// Highest rate reported for a single shard on a single node
    pub max_unique_stream_rate: i64,
    /// Most shards a single node reported for one stream
    pub max_shard_count: usize,
    /// Distinct tenants named by the samples, unnamed ones excluded
    pub tenants: usize,
}

/// Fold one refresh worth of node reports into a snapshot.
///
/// Within a node, shards of the same stream are summed. Across nodes, the
/// per-node totals of a stream are replicas of each other and the highest
/// one wins. Both folds are order-insensitive.
pub fn aggregate(reports: &[NodeReport]) -> (RateSnapshot, AggregateStats) {
    let mut rates: AHashMap<u64, i64> = AHashMap::new();
    let mut shards: AHashMap<u64, usize> = AHashMap::new();
    let mut tenants: AHashSet<&str> = AHashSet::new();
    let mut stats = AggregateStats::default();

    for report in reports {
        let mut node_totals: AHashMap<u64, i64> = AHashMap::new();
        let mut node_shards: AHashMap<u64, AHashSet<u64>> = AHashMap::new();

        for sample in &report.rates {
            stats.max_unique_stream_rate = stats.max_unique_stream_rate.max(sample.rate);
            if !sample.tenant.is_empty() {
                tenants.insert(sample.tenant.as_str());
            }

            let total = node_totals.entry(sample.stream_hash_no_shard).or_insert(0);
            *total = total.saturating_add(sample.rate);
            node_shards
                .entry(sample.stream_hash_no_shard)
                .or_default()
                .insert(sample.stream_hash);
        }

        for (stream, total) in node_totals {
            rates
                .entry(stream)
                .and_modify(|current| *current = (*current).max(total))
                .or_insert(total);
        }
        for (stream, ids) in node_shards {
            let count = shards.entry(stream).or_insert(0);
            *count = (*count).max(ids.len());
        }
    }

    stats.streams = rates.len();
    stats.tenants = tenants.len();
    stats.max_stream_rate = rates.values().copied().max().unwrap_or(0);
    stats.max_shard_count = shards.values().copied().max().unwrap_or(0);

    (RateSnapshot::from_parts(rates, shards), stats)
}
