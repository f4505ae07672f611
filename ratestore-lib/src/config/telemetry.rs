use serde::Deserialize;

/// Telemetry configuration
/// Controls the metrics and health endpoints of the `ratestore` process
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    /// Observability server port (optional)
    /// If provided, serves `/metrics`, `/health`, `/ready` and `/rates/{stream}`
    /// Default: None (server and metrics disabled)
    #[serde(default)]
    pub metrics_port: Option<u16>,
    /// OpenTelemetry internal log level
    /// Controls verbosity of OpenTelemetry SDK internal logs (not application logs)
    /// Options: "trace", "debug", "info", "warn", "error"
    /// Default: "warn"
    #[serde(default = "default_otel_log_level")]
    pub otel_log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { metrics_port: None, otel_log_level: default_otel_log_level() }
    }
}

fn default_otel_log_level() -> String {
    "warn".to_string()
}

/// Logging configuration
/// Controls application-level structured logging (stdout/stderr)
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    /// Default: "info"
    /// Can be overridden at runtime via RUST_LOG environment variable
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Show module path (target) in log messages
    /// Default: false
    #[serde(default)]
    pub show_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), show_target: false }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
