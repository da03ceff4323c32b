//! Exposition text decoding.
//!
//! The radio node publishes one metric per line as `<name> <value>`, with
//! `# HELP` / `# TYPE` metadata lines in between:
//!
//! ```text
//! # HELP cqi_value Current Channel Quality Indicator
//! # TYPE cqi_value gauge
//! cqi_value 8.5
//! mcs_setting 16
//! throughput_bps 50000000
//! ```
//!
//! Only the names in [`Field`] are recognized. Anything else, and any line
//! that cannot be read, is skipped.

use linktune_core::MetricRecord;

use crate::error::TelemetryResult;

/// Recognized metric names. Matching is exact and case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Cqi,
    Mcs,
    Throughput,
    Bler,
    ResourceUtilization,
    ConnectedUes,
}

impl Field {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "cqi_value" => Some(Field::Cqi),
            "mcs_setting" => Some(Field::Mcs),
            "throughput_bps" => Some(Field::Throughput),
            "bler_percentage" => Some(Field::Bler),
            "resource_utilization" => Some(Field::ResourceUtilization),
            "connected_ues" => Some(Field::ConnectedUes),
            _ => None,
        }
    }

    fn apply(self, record: &mut MetricRecord, value: f64) {
        match self {
            Field::Cqi => record.cqi = Some(value),
            // Float-to-int `as` truncates toward zero and saturates.
            Field::Mcs => record.mcs = Some(value as i32),
            Field::Throughput => record.throughput_mbps = Some(value / 1_000_000.0),
            Field::Bler => record.bler = Some(value),
            Field::ResourceUtilization => record.resource_usage = Some(value),
            Field::ConnectedUes => record.ue_count = Some(value as u32),
        }
    }
}

/// Decode exposition text into a record tagged with `source`.
///
/// Fails only when `raw` is not UTF-8. Missing measurements stay `None`;
/// nothing is filled in on the caller's behalf.
pub fn parse_exposition(raw: &[u8], source: &str) -> TelemetryResult<MetricRecord> {
    let text = std::str::from_utf8(raw)?;
    let mut record = MetricRecord::empty(source);

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut parts = line.split_whitespace();
        let (Some(name), Some(raw_value)) = (parts.next(), parts.next()) else {
            continue;
        };

        let Some(field) = Field::from_name(name) else {
            continue;
        };

        match raw_value.parse::<f64>() {
            Ok(value) if value.is_finite() => field.apply(&mut record, value),
            _ => continue,
        }
    }

    Ok(record)
}
