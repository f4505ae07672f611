use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::aggregator::aggregate;
use super::poller::RatePoller;
use super::store::SnapshotStore;
use super::types::RateSnapshot;
use crate::client::ClientPool;
use crate::config::RateStoreConfig;
use crate::error::{RateStoreError, Result};
use crate::limits::TenantOverrides;
use crate::ring::Membership;
use crate::telemetry::metrics::values;
use crate::telemetry::Metrics;

/// Lifecycle of a [`RateStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServiceState {
    Idle = 0,
    Running = 1,
    Stopping = 2,
    Stopped = 3,
}

impl ServiceState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::Stopping,
            _ => Self::Stopped,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        }
    }
}

/// What a single refresh did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// No tenant has stream sharding enabled, nothing was polled
    Skipped,
    /// A new snapshot was published
    Published { nodes: usize, streams: usize },
}

struct Inner {
    poller: RatePoller,
    store: SnapshotStore,
    interval: Duration,
    // One cycle at a time, scheduled or manual.
    cycle: Mutex<()>,
    state: AtomicU8,
    stop: CancellationToken,
    terminated: watch::Sender<bool>,
    metrics: Option<Arc<Metrics>>,
}

/// Periodically refreshed view of per-stream ingestion rates
///
/// [`RateStore::rate_for`] is safe to call from any number of tasks at any
/// time, including before the first refresh (it then returns 0).
pub struct RateStore {
    inner: Arc<Inner>,
}

impl RateStore {
    pub fn new(
        cfg: RateStoreConfig,
        ring: Arc<dyn Membership>,
        pool: Arc<dyn ClientPool>,
        overrides: Arc<dyn TenantOverrides>,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        let poller = RatePoller::new(
            ring,
            pool,
            overrides,
            cfg.max_parallelism,
            cfg.ingester_request_timeout(),
            metrics.clone(),
        );
        let (terminated, _) = watch::channel(false);

        Self {
            inner: Arc::new(Inner {
                poller,
                store: SnapshotStore::new(),
                interval: cfg.stream_rate_update_interval(),
                cycle: Mutex::new(()),
                state: AtomicU8::new(ServiceState::Idle as u8),
                stop: CancellationToken::new(),
                terminated,
                metrics,
            }),
        }
    }

    /// Aggregated rate of a stream, 0 if it is unknown
    #[inline]
    pub fn rate_for(&self, stream_hash_no_shard: u64) -> i64 {
        self.inner.store.rate_for(stream_hash_no_shard)
    }

    /// The snapshot lookups are currently served from
    pub fn snapshot(&self) -> Arc<RateSnapshot> {
        self.inner.store.snapshot()
    }

    pub fn state(&self) -> ServiceState {
        ServiceState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// Start the refresh loop in the background.
    ///
    /// Returns as soon as the loop is spawned; the first refresh runs right
    /// away. Cancelling `ctx` stops the loop just like [`RateStore::stop_async`].
    pub fn start_async(&self, ctx: &CancellationToken) -> Result<()> {
        if ctx.is_cancelled() {
            return Err(RateStoreError::Cancelled);
        }
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| RateStoreError::Runtime(e.to_string()))?;

        self.transition(ServiceState::Idle, ServiceState::Running)
            .map_err(|_| RateStoreError::AlreadyStarted)?;

        info!(interval = ?self.inner.interval, "starting rate store");
        handle.spawn(run(Arc::clone(&self.inner), ctx.clone()));
        Ok(())
    }

    /// Ask the refresh loop to stop without waiting for it.
    ///
    /// A refresh in progress is abandoned and never publishes, so the last
    /// snapshot stays in place. Use [`RateStore::await_terminated`] to wait.
    pub fn stop_async(&self) -> Result<()> {
        loop {
            match self.state() {
                ServiceState::Idle => {
                    if self.transition(ServiceState::Idle, ServiceState::Stopped).is_ok() {
                        self.inner.terminated.send_replace(true);
                        return Ok(());
                    }
                }
                ServiceState::Running => {
                    if self.transition(ServiceState::Running, ServiceState::Stopping).is_ok() {
                        info!("stopping rate store");
                        self.inner.stop.cancel();
                        return Ok(());
                    }
                }
                ServiceState::Stopping | ServiceState::Stopped => {
                    return Err(RateStoreError::NotRunning)
                }
            }
        }
    }

    /// Wait until the refresh loop has exited
    pub async fn await_terminated(&self) {
        let mut rx = self.inner.terminated.subscribe();
        // The sender lives in `inner`, which we hold.
        let _ = rx.wait_for(|done| *done).await;
    }

    /// Run a single refresh in the caller's task.
    ///
    /// Waits for a refresh already in progress to finish first, so the
    /// snapshot published here is never overwritten by an older cycle.
    /// Errors are those that abort a whole refresh (membership lookup);
    /// per-node failures only shrink the published snapshot.
    pub async fn refresh_once(&self) -> Result<RefreshOutcome> {
        self.inner.refresh().await
    }

    fn transition(&self, from: ServiceState, to: ServiceState) -> Result<()> {
        self.inner
            .state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| RateStoreError::NotRunning)
    }
}

impl Drop for RateStore {
    fn drop(&mut self) {
        self.inner.stop.cancel();
    }
}

impl Inner {
    async fn refresh(&self) -> Result<RefreshOutcome> {
        let _cycle = self.cycle.lock().await;
        let start = Instant::now();

        let reports = match self.poller.poll().await {
            Ok(Some(reports)) => reports,
            Ok(None) => {
                if let Some(ref m) = self.metrics {
                    m.record_refresh_skipped();
                }
                return Ok(RefreshOutcome::Skipped);
            }
            Err(e) => {
                error!(error = %e, "unable to refresh stream rates, keeping previous snapshot");
                if let Some(ref m) = self.metrics {
                    m.record_refresh(values::STATUS_FAILURE, start.elapsed().as_secs_f64());
                }
                return Err(e);
            }
        };

        let (snapshot, stats) = aggregate(&reports);
        self.store.publish(snapshot);

        if let Some(ref m) = self.metrics {
            m.record_refresh(values::STATUS_SUCCESS, start.elapsed().as_secs_f64());
            m.record_snapshot(&stats);
        }
        debug!(
            nodes = reports.len(),
            streams = stats.streams,
            tenants = stats.tenants,
            elapsed = ?start.elapsed(),
            "refreshed stream rates"
        );

        Ok(RefreshOutcome::Published { nodes: reports.len(), streams: stats.streams })
    }
}

async fn run(inner: Arc<Inner>, ctx: CancellationToken) {
    let mut ticker = tokio::time::interval(inner.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = async {
        tokio::select! {
            _ = inner.stop.cancelled() => {}
            _ = ctx.cancelled() => {}
        }
    };
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
        }

        // Refreshes run inline, so a slow one delays the next tick instead
        // of overlapping it.
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                debug!("abandoning in-flight rate refresh");
                break;
            }
            _ = inner.refresh() => {}
        }
    }

    inner.state.store(ServiceState::Stopped as u8, Ordering::Release);
    inner.terminated.send_replace(true);
    info!("rate store stopped");
}
