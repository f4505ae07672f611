//! Background store of per-stream ingestion rates.
//!
//! Every refresh polls the healthy nodes for the rates they observe,
//! folds the per-node reports into one snapshot and publishes it. Lookups
//! read the last published snapshot and never wait on a refresh.
//!
//! # Components
//!
//! 1. **Poller** (`poller.rs`): feature gate, membership lookup and a
//!    bounded fan-out of per-node requests, each with its own deadline.
//!
//! 2. **Aggregator** (`aggregator.rs`): sums the shards of a stream within
//!    a node, then keeps the highest total across replicas.
//!
//! 3. **SnapshotStore** (`store.rs`): immutable snapshot behind an
//!    atomically swapped pointer.
//!
//! 4. **RateStore** (`service.rs`): lifecycle and the refresh loop.
//!
//! # Example Usage
//!
//! ```ignore
//! use ratestore_lib::{RateStore, RateStoreConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let store = RateStore::new(RateStoreConfig::default(), ring, pool, overrides, None);
//! store.start_async(&CancellationToken::new())?;
//!
//! // On the push path
//! let rate = store.rate_for(stream_hash_no_shard);
//! ```

mod aggregator;
mod poller;
mod service;
mod store;
mod types;

pub use aggregator::{aggregate, AggregateStats};
pub use poller::RatePoller;
pub use service::{RateStore, RefreshOutcome, ServiceState};
pub use store::SnapshotStore;
pub use types::{NodeReport, RateSnapshot, StreamRate};
