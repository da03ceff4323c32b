//! linktune-core — shared building blocks for the linktune controller.
//!
//! Holds the types every stage of the control loop exchanges, the TOML
//! configuration layer, and a small hyper-based HTTP/1.1 transport used
//! by both the telemetry sources and the control client.
//!
//! ```text
//! MetricRecord ──► DecisionEngine ──► Action ──► CommandSink
//! ```

pub mod config;
pub mod error;
pub mod sink;
pub mod transport;
pub mod types;

pub use config::{EngineConfig, SinkConfig, SourceConfig, TelemetryConfig, TunerConfig};
pub use error::{ConfigError, ConfigResult, TransportError, TransportResult};
pub use sink::CommandSink;
pub use transport::{HttpSession, Reply};
pub use types::*;
