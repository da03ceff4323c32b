//! Error types shared across linktune crates.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type alias for HTTP transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors raised while loading or validating a `linktune.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors from the HTTP transport.
///
/// Callers treat every variant as "peer unavailable"; the variants exist
/// so logs say what actually went wrong.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("http handshake failed: {0}")]
    Handshake(#[source] hyper::Error),

    #[error("failed to build request: {0}")]
    Build(#[from] http::Error),

    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("request failed: {0}")]
    Request(#[source] hyper::Error),

    #[error("failed to read response body: {0}")]
    Body(#[source] hyper::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}
