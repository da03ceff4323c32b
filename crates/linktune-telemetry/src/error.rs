//! Telemetry error types.

use thiserror::Error;

use linktune_core::TransportError;

pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Why a single source produced no record this round.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("source returned status {0}")]
    BadStatus(u16),

    #[error("telemetry is not valid text: {0}")]
    ParseFailure(#[from] std::str::Utf8Error),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
