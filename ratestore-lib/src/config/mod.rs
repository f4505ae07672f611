mod loader;
mod rate_store;
mod telemetry;
mod types;

pub use loader::{load_from_path, parse};
pub use rate_store::RateStoreConfig;
pub use telemetry::{LoggingConfig, TelemetryConfig};
pub use types::{Config, NodeConfig};
