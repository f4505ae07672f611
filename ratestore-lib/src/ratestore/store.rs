use arc_swap::ArcSwap;
use std::sync::Arc;

use super::types::RateSnapshot;

/// Holder of the current snapshot
///
/// Readers load the pointer without locking; a publish swaps it in one step,
/// so a lookup sees either the previous refresh or the new one, never a mix.
pub struct SnapshotStore {
    current: ArcSwap<RateSnapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self { current: ArcSwap::from_pointee(RateSnapshot::default()) }
    }

    pub fn publish(&self, snapshot: RateSnapshot) {
        self.current.store(Arc::new(snapshot));
    }

    /// Aggregated rate of a stream, 0 when unknown
    #[inline]
    pub fn rate_for(&self, stream_hash_no_shard: u64) -> i64 {
        self.current.load().rate_for(stream_hash_no_shard)
    }

    /// The current snapshot, for several lookups against the same refresh
    pub fn snapshot(&self) -> Arc<RateSnapshot> {
        self.current.load_full()
    }

    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
