use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::types::{NodeReport, StreamRate};
use crate::client::{ClientPool, RateClient};
use crate::error::{RateStoreError, Result};
use crate::limits::{any_sharding_enabled, TenantOverrides};
use crate::ring::{Membership, NodeAddr, Operation};
use crate::telemetry::metrics::values;
use crate::telemetry::Metrics;

/// Collects one refresh worth of stream rates from the healthy nodes
pub struct RatePoller {
    ring: Arc<dyn Membership>,
    pool: Arc<dyn ClientPool>,
    overrides: Arc<dyn TenantOverrides>,
    max_parallelism: usize,
    request_timeout: Duration,
    metrics: Option<Arc<Metrics>>,
}

impl RatePoller {
    pub fn new(
        ring: Arc<dyn Membership>,
        pool: Arc<dyn ClientPool>,
        overrides: Arc<dyn TenantOverrides>,
        max_parallelism: usize,
        request_timeout: Duration,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        Self {
            ring,
            pool,
            overrides,
            max_parallelism: max_parallelism.max(1),
            request_timeout,
            metrics,
        }
    }

    /// Poll every healthy node once.
    ///
    /// Returns `Ok(None)` when no tenant has stream sharding enabled; no
    /// node is contacted in that case. Fails only when the node set itself
    /// cannot be determined. Nodes that cannot be reached are left out of
    /// the result and their client is evicted from the pool.
    pub async fn poll(&self) -> Result<Option<Vec<NodeReport>>> {
        if !any_sharding_enabled(self.overrides.as_ref()) {
            debug!("stream sharding disabled for all tenants, skipping rate refresh");
            return Ok(None);
        }

        let nodes = self.ring.healthy_nodes(Operation::Read)?;
        Ok(Some(self.fetch_all(nodes).await))
    }

    async fn fetch_all(&self, nodes: Vec<NodeAddr>) -> Vec<NodeReport> {
        let limiter = Arc::new(Semaphore::new(self.max_parallelism));
        let mut tasks = JoinSet::new();

        for addr in nodes {
            let client = match self.pool.client_for(&addr) {
                Ok(client) => client,
                Err(e) => {
                    warn!(%addr, error = %e, "unable to get client for node, skipping");
                    self.record_failure(values::REASON_CLIENT);
                    continue;
                }
            };

            // At most max_parallelism requests in flight; the semaphore is never closed.
            let Ok(permit) = Arc::clone(&limiter).acquire_owned().await else {
                break;
            };
            let timeout = self.request_timeout;
            tasks.spawn(async move {
                let _permit = permit;
                let result = fetch_one(&addr, client, timeout).await;
                (addr, result)
            });
        }

        let mut reports = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((addr, Ok(rates))) => reports.push(NodeReport::new(addr, rates)),
                Ok((addr, Err(e))) => {
                    warn!(%addr, error = %e, "unable to get stream rates from node");
                    self.pool.evict(&addr);
                    self.record_failure(match e {
                        RateStoreError::Timeout { .. } => values::REASON_TIMEOUT,
                        _ => values::REASON_RPC,
                    });
                }
                Err(e) => {
                    warn!(error = %e, "stream rate request task failed");
                    self.record_failure(values::REASON_RPC);
                }
            }
        }

        reports
    }

    fn record_failure(&self, reason: &'static str) {
        if let Some(ref m) = self.metrics {
            m.record_node_failure(reason);
        }
    }
}

async fn fetch_one(
    addr: &str,
    client: Arc<dyn RateClient>,
    timeout: Duration,
) -> Result<Vec<StreamRate>> {
    match tokio::time::timeout(timeout, client.stream_rates()).await {
        Ok(result) => result,
        Err(_) => Err(RateStoreError::Timeout { addr: addr.to_string() }),
    }
}
