use thiserror::Error;

/// Errors that can occur in the rate store
#[derive(Error, Debug)]
pub enum RateStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Membership lookup failed: {0}")]
    Membership(String),

    #[error("No client available for {addr}: {reason}")]
    ClientUnavailable { addr: String, reason: String },

    #[error("Stream rate request to {addr} failed: {reason}")]
    Rpc { addr: String, reason: String },

    #[error("Stream rate request to {addr} timed out")]
    Timeout { addr: String },

    #[error("Rate store already started")]
    AlreadyStarted,

    #[error("Rate store is not running")]
    NotRunning,

    #[error("Context already cancelled")]
    Cancelled,

    #[error("Runtime error: {0}")]
    Runtime(String),
}

pub type Result<T> = std::result::Result<T, RateStoreError>;
