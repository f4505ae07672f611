mod http_pool;

pub use http_pool::{HttpClientPool, HttpRateClient, StreamRatesResponse, STREAM_RATES_PATH};

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::ratestore::StreamRate;

/// Remote call returning the per-stream rates a node currently observes
#[async_trait]
pub trait RateClient: Send + Sync {
    async fn stream_rates(&self) -> Result<Vec<StreamRate>>;
}

/// Hands out reusable clients bound to a node address
pub trait ClientPool: Send + Sync {
    fn client_for(&self, addr: &str) -> Result<Arc<dyn RateClient>>;

    /// Forget the client of a node whose request failed
    fn evict(&self, _addr: &str) {}
}
