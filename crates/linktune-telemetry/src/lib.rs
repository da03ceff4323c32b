//! linktune-telemetry — radio telemetry acquisition.
//!
//! Pulls exposition-format text from one or two HTTP endpoints, decodes it
//! into `MetricRecord`s, merges the two by priority, and keeps the last good
//! result around for a short freshness window.
//!
//! # Architecture
//!
//! ```text
//! MetricsAggregator
//!   ├── primary:   TelemetrySource (direct node endpoint)   ─┐
//!   ├── secondary: TelemetrySource (aggregated service)     ─┴─ tokio::join!
//!   ├── merge_records() → primary fields win, secondary fills gaps
//!   └── cache (record, fetched_at) → cached() while younger than freshness
//! ```
//!
//! Source failures never escape `fetch()`: they are logged and the source is
//! treated as unavailable for that round.

pub mod aggregator;
pub mod error;
pub mod parser;
pub mod source;

pub use aggregator::{AggregatorSummary, MetricsAggregator, merge_records};
pub use error::{TelemetryError, TelemetryResult};
pub use parser::parse_exposition;
pub use source::{ExpositionSource, TelemetrySource};
