#![forbid(unsafe_code)]

pub mod client;
pub mod config;
pub mod error;
pub mod limits;
pub mod ratestore;
pub mod ring;
pub mod telemetry;

pub use client::{ClientPool, HttpClientPool, HttpRateClient, RateClient};
pub use config::{load_from_path, Config, RateStoreConfig};
pub use error::{RateStoreError, Result};
pub use limits::{ShardStreamsConfig, StaticOverrides, TenantLimits, TenantOverrides};
pub use ratestore::{RateSnapshot, RateStore, RefreshOutcome, ServiceState, StreamRate};
pub use ring::{Membership, NodeAddr, Operation, StaticMembership};
