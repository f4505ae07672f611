use opentelemetry::global;
use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter};
use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::Registry;
use std::sync::Arc;

use crate::ratestore::AggregateStats;

pub mod labels {
    pub const STATUS: &str = "status";
    pub const REASON: &str = "reason";
    pub const VERSION: &str = "version";
    pub const RUST_VERSION: &str = "rust_version";
}

pub mod values {
    pub const STATUS_SUCCESS: &str = "success";
    pub const STATUS_FAILURE: &str = "failure";
    pub const STATUS_SKIPPED: &str = "skipped";
    pub const REASON_CLIENT: &str = "client";
    pub const REASON_RPC: &str = "rpc";
    pub const REASON_TIMEOUT: &str = "timeout";
}

#[derive(Clone)]
pub struct Metrics {
    pub refreshes_total: Counter<u64>,
    pub refresh_duration_seconds: Histogram<f64>,

    // Per-node failures, reason label: "client" | "rpc" | "timeout"
    pub node_failures_total: Counter<u64>,

    // Shape of the current snapshot
    pub streams: Gauge<u64>,
    pub max_stream_rate_bytes: Gauge<i64>,
    pub max_unique_stream_rate_bytes: Gauge<i64>,
    pub max_stream_shard_count: Gauge<u64>,
    pub tenants: Gauge<u64>,

    pub build_info: Gauge<u64>,
}

impl Metrics {
    pub fn from_meter(meter: Meter) -> Self {
        Self {
            refreshes_total: meter
                .u64_counter("ratestore_refreshes_total")
                .with_description("Total number of rate store refreshes by status")
                .build(),
            refresh_duration_seconds: meter
                .f64_histogram("ratestore_refresh_duration_seconds")
                .with_description("Duration of a rate store refresh in seconds")
                .build(),

            node_failures_total: meter
                .u64_counter("ratestore_node_failures_total")
                .with_description("Nodes left out of a refresh. reason=client|rpc|timeout")
                .build(),

            streams: meter
                .u64_gauge("ratestore_streams")
                .with_description("Number of streams in the current snapshot")
                .build(),
            max_stream_rate_bytes: meter
                .i64_gauge("ratestore_max_stream_rate_bytes")
                .with_description("Highest aggregated stream rate in the current snapshot")
                .build(),
            max_unique_stream_rate_bytes: meter
                .i64_gauge("ratestore_max_unique_stream_rate_bytes")
                .with_description("Highest single-shard rate reported by any node")
                .build(),
            max_stream_shard_count: meter
                .u64_gauge("ratestore_max_stream_shard_count")
                .with_description("Most shards any node reported for a single stream")
                .build(),
            tenants: meter
                .u64_gauge("ratestore_tenants")
                .with_description("Tenants named by the samples of the current snapshot")
                .build(),

            build_info: meter
                .u64_gauge("ratestore_build_info")
                .with_description("Build information")
                .build(),
        }
    }

    /// Set build info metric with version labels
    pub fn set_build_info(&self) {
        let version = env!("CARGO_PKG_VERSION");
        let rust_version = env!("CARGO_PKG_RUST_VERSION");

        self.build_info.record(
            1,
            &[
                KeyValue::new(labels::VERSION, version),
                KeyValue::new(labels::RUST_VERSION, rust_version),
            ],
        );
    }

    pub fn record_refresh(&self, status: &'static str, duration_secs: f64) {
        let attrs = &[KeyValue::new(labels::STATUS, status)];
        self.refreshes_total.add(1, attrs);
        self.refresh_duration_seconds.record(duration_secs, attrs);
    }

    pub fn record_refresh_skipped(&self) {
        self.refreshes_total
            .add(1, &[KeyValue::new(labels::STATUS, values::STATUS_SKIPPED)]);
    }

    pub fn record_node_failure(&self, reason: &'static str) {
        self.node_failures_total
            .add(1, &[KeyValue::new(labels::REASON, reason)]);
    }

    pub fn record_snapshot(&self, stats: &AggregateStats) {
        self.streams
            .record(u64::try_from(stats.streams).unwrap_or(u64::MAX), &[]);
        self.max_stream_rate_bytes.record(stats.max_stream_rate, &[]);
        self.max_unique_stream_rate_bytes
            .record(stats.max_unique_stream_rate, &[]);
        self.max_stream_shard_count
            .record(u64::try_from(stats.max_shard_count).unwrap_or(u64::MAX), &[]);
        self.tenants
            .record(u64::try_from(stats.tenants).unwrap_or(u64::MAX), &[]);
    }
}

pub fn init_metrics() -> Result<(Arc<Metrics>, Registry), Box<dyn std::error::Error + Send + Sync>>
{
    let registry = Registry::default();

    let exporter = opentelemetry_prometheus::exporter()
        .with_registry(registry.clone())
        .build()?;

    let meter_provider = SdkMeterProvider::builder().with_reader(exporter).build();

    global::set_meter_provider(meter_provider);

    let meter = global::meter("ratestore");
    let metrics = Arc::new(Metrics::from_meter(meter));

    metrics.set_build_info();

    Ok((metrics, registry))
}
