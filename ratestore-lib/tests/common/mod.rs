//! Shared fakes for the rate store tests
#![allow(dead_code)]

use ahash::AHashMap;
use async_trait::async_trait;
use ratestore_lib::{
    ClientPool, Membership, NodeAddr, Operation, RateClient, RateStore, RateStoreConfig,
    RateStoreError, Result, ShardStreamsConfig, StreamRate, TenantLimits, TenantOverrides,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Membership returning whatever node set the test configured
#[derive(Default)]
pub struct FakeRing {
    nodes: Mutex<Vec<NodeAddr>>,
    fail: AtomicBool,
    pub lookups: AtomicUsize,
}

impl FakeRing {
    pub fn set_nodes(&self, nodes: &[&str]) {
        *lock(&self.nodes) = nodes.iter().map(|n| n.to_string()).collect();
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl Membership for FakeRing {
    fn healthy_nodes(&self, op: Operation) -> Result<Vec<NodeAddr>> {
        assert_eq!(op, Operation::Read);
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(RateStoreError::Membership("ring unavailable".to_string()));
        }
        Ok(lock(&self.nodes).clone())
    }
}

/// Client pool keyed by node address; unknown addresses fail
#[derive(Default)]
pub struct FakeClientPool {
    clients: Mutex<HashMap<String, Arc<dyn RateClient>>>,
    evicted: Mutex<Vec<String>>,
}

impl FakeClientPool {
    pub fn set_client(&self, addr: &str, client: FakeRateClient) {
        lock(&self.clients).insert(addr.to_string(), Arc::new(client));
    }

    pub fn clear(&self) {
        lock(&self.clients).clear();
    }

    /// Addresses the store asked to evict, in order; clients stay in place
    pub fn evicted(&self) -> Vec<String> {
        lock(&self.evicted).clone()
    }
}

impl ClientPool for FakeClientPool {
    fn client_for(&self, addr: &str) -> Result<Arc<dyn RateClient>> {
        lock(&self.clients).get(addr).cloned().ok_or_else(|| {
            RateStoreError::ClientUnavailable {
                addr: addr.to_string(),
                reason: "no such client".to_string(),
            }
        })
    }

    fn evict(&self, addr: &str) {
        lock(&self.evicted).push(addr.to_string());
    }
}

/// Counts calls and concurrent calls across every client sharing it
#[derive(Default)]
pub struct Probe {
    pub calls: AtomicUsize,
    current: AtomicUsize,
    pub peak: AtomicUsize,
}

impl Probe {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a Probe);

impl<'a> InFlight<'a> {
    fn enter(probe: &'a Probe) -> Self {
        probe.calls.fetch_add(1, Ordering::SeqCst);
        let now = probe.current.fetch_add(1, Ordering::SeqCst) + 1;
        probe.peak.fetch_max(now, Ordering::SeqCst);
        Self(probe)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct FakeRateClient {
    rates: Vec<StreamRate>,
    fail: bool,
    delay: Duration,
    probe: Arc<Probe>,
}

impl FakeRateClient {
    pub fn new(rates: Vec<StreamRate>) -> Self {
        Self { rates, fail: false, delay: Duration::ZERO, probe: Arc::new(Probe::default()) }
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::new(vec![]) }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_probe(mut self, probe: Arc<Probe>) -> Self {
        self.probe = probe;
        self
    }
}

#[async_trait]
impl RateClient for FakeRateClient {
    async fn stream_rates(&self) -> Result<Vec<StreamRate>> {
        let _in_flight = InFlight::enter(&self.probe);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(RateStoreError::Rpc {
                addr: "fake".to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(self.rates.clone())
    }
}

/// Single-tenant overrides with a switchable sharding flag
pub struct FakeOverrides {
    enabled: AtomicBool,
}

impl FakeOverrides {
    pub fn new(enabled: bool) -> Self {
        Self { enabled: AtomicBool::new(enabled) }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}

impl TenantOverrides for FakeOverrides {
    fn all_by_tenant(&self) -> AHashMap<String, TenantLimits> {
        let mut tenants = AHashMap::new();
        tenants.insert(
            "tenant-1".to_string(),
            TenantLimits {
                shard_streams: ShardStreamsConfig {
                    enabled: self.enabled.load(Ordering::SeqCst),
                    ..Default::default()
                },
            },
        );
        tenants
    }
}

pub fn rates(samples: &[(u64, u64, i64)]) -> Vec<StreamRate> {
    samples
        .iter()
        .map(|&(hash, no_shard, rate)| StreamRate::new(hash, no_shard, rate))
        .collect()
}

pub struct TestContext {
    pub ring: Arc<FakeRing>,
    pub pool: Arc<FakeClientPool>,
    pub overrides: Arc<FakeOverrides>,
    pub store: RateStore,
}

pub fn test_config() -> RateStoreConfig {
    RateStoreConfig::new(5, Duration::from_secs(1), Duration::from_millis(10))
}

pub fn setup(enabled: bool) -> TestContext {
    setup_with(test_config(), enabled)
}

pub fn setup_with(cfg: RateStoreConfig, enabled: bool) -> TestContext {
    let ring = Arc::new(FakeRing::default());
    let pool = Arc::new(FakeClientPool::default());
    let overrides = Arc::new(FakeOverrides::new(enabled));
    let store = RateStore::new(cfg, ring.clone(), pool.clone(), overrides.clone(), None);

    TestContext { ring, pool, overrides, store }
}

/// Poll `cond` every millisecond until it holds or `timeout` elapses
pub async fn eventually<F: Fn() -> bool>(timeout: Duration, cond: F) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if cond() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}
