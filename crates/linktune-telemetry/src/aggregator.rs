//! Merges two telemetry sources and caches the result.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};

use linktune_core::{MetricRecord, TelemetryConfig};

use crate::source::{ExpositionSource, TelemetrySource};

/// Last merged record and when it was fetched.
struct CacheEntry {
    record: MetricRecord,
    fetched_at: Instant,
}

/// Collection status, for external inspection.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AggregatorSummary {
    pub primary_source: String,
    pub secondary_source: String,
    /// Seconds since the last successful merge, if any.
    pub last_update_age_secs: Option<f64>,
    pub cached_metrics_available: bool,
    pub metrics_keys: Vec<&'static str>,
}

/// Fetches from a primary and a secondary source and merges by priority.
pub struct MetricsAggregator<P, S> {
    primary: P,
    secondary: S,
    freshness: Duration,
    cache: Option<CacheEntry>,
}

impl MetricsAggregator<ExpositionSource, Option<ExpositionSource>> {
    /// Build the HTTP-backed aggregator described by the config.
    pub fn from_config(config: &TelemetryConfig) -> Self {
        let primary = ExpositionSource::new(&config.primary, config.timeout);
        let secondary = config
            .secondary
            .as_ref()
            .map(|s| ExpositionSource::new(s, config.timeout));
        Self::new(primary, secondary, config.freshness)
    }
}

impl<P: TelemetrySource, S: TelemetrySource> MetricsAggregator<P, S> {
    pub fn new(primary: P, secondary: S, freshness: Duration) -> Self {
        Self {
            primary,
            secondary,
            freshness,
            cache: None,
        }
    }

    /// Fetch both sources concurrently and merge.
    ///
    /// Returns `None` when neither source produced a usable record; the
    /// cache is left untouched in that case.
    pub async fn fetch(&mut self) -> Option<MetricRecord> {
        let (primary, secondary) = tokio::join!(self.primary.fetch(), self.secondary.fetch());

        let primary = primary
            .inspect_err(|e| warn!(source = self.primary.tag(), error = %e, "primary telemetry unavailable"))
            .ok();
        let secondary = secondary
            .inspect_err(|e| debug!(source = self.secondary.tag(), error = %e, "secondary telemetry unavailable"))
            .ok();

        let merged = merge_records(primary, secondary)?;

        debug!(
            source = %merged.source,
            cqi = ?merged.cqi,
            mcs = ?merged.mcs,
            throughput_mbps = ?merged.throughput_mbps,
            "telemetry updated"
        );

        self.cache = Some(CacheEntry {
            record: merged.clone(),
            fetched_at: Instant::now(),
        });
        Some(merged)
    }

    /// The last merged record, if it is still within the freshness window.
    pub fn cached(&self) -> Option<MetricRecord> {
        self.cache
            .as_ref()
            .filter(|entry| entry.fetched_at.elapsed() < self.freshness)
            .map(|entry| entry.record.clone())
    }

    pub fn summary(&self) -> AggregatorSummary {
        AggregatorSummary {
            primary_source: self.primary.tag().to_string(),
            secondary_source: self.secondary.tag().to_string(),
            last_update_age_secs: self
                .cache
                .as_ref()
                .map(|entry| entry.fetched_at.elapsed().as_secs_f64()),
            cached_metrics_available: self.cached().is_some(),
            metrics_keys: self
                .cache
                .as_ref()
                .map(|entry| entry.record.field_names())
                .unwrap_or_default(),
        }
    }
}

/// Merge two optional records. Primary fields win; the secondary only fills
/// gaps. The merged record carries the primary's tag and timestamp when the
/// primary contributed at least one field.
///
/// Returns `None` if the result would contain no recognized field.
pub fn merge_records(
    primary: Option<MetricRecord>,
    secondary: Option<MetricRecord>,
) -> Option<MetricRecord> {
    let primary = primary.filter(MetricRecord::has_fields);
    let secondary = secondary.filter(MetricRecord::has_fields);

    match (primary, secondary) {
        (Some(p), Some(s)) => Some(MetricRecord {
            cqi: p.cqi.or(s.cqi),
            mcs: p.mcs.or(s.mcs),
            throughput_mbps: p.throughput_mbps.or(s.throughput_mbps),
            bler: p.bler.or(s.bler),
            resource_usage: p.resource_usage.or(s.resource_usage),
            ue_count: p.ue_count.or(s.ue_count),
            timestamp: p.timestamp,
            source: p.source,
        }),
        (Some(p), None) => Some(p),
        (None, Some(s)) => Some(s),
        (None, None) => None,
    }
}
