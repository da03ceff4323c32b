//! Domain types passed between the stages of the control loop.
//!
//! A `MetricRecord` is produced once per iteration by the telemetry layer,
//! an `Action` at most once per iteration by the decision engine. Neither
//! outlives the iteration except through the aggregator cache.

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// ── Telemetry ──────────────────────────────────────────────────────

/// One merged sample of radio-quality telemetry.
///
/// Every measurement is optional. A record is only meaningful when at
/// least one of them is present (see [`MetricRecord::has_fields`]).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricRecord {
    /// Channel-quality indicator (0–15, higher is better).
    pub cqi: Option<f64>,
    /// Coding index reported by the radio node.
    pub mcs: Option<i32>,
    /// Downlink throughput in megabits per second.
    pub throughput_mbps: Option<f64>,
    /// Block error rate, as reported.
    pub bler: Option<f64>,
    /// Radio resource utilization, as reported.
    pub resource_usage: Option<f64>,
    /// Number of connected endpoints.
    pub ue_count: Option<u32>,
    /// Unix timestamp (fractional seconds) when the record was produced.
    pub timestamp: f64,
    /// Tag of the source that produced the record ("gnb", "prometheus", ...).
    pub source: String,
}

impl MetricRecord {
    /// An empty record stamped with the current time.
    pub fn empty(source: impl Into<String>) -> Self {
        Self {
            cqi: None,
            mcs: None,
            throughput_mbps: None,
            bler: None,
            resource_usage: None,
            ue_count: None,
            timestamp: epoch_secs_f64(),
            source: source.into(),
        }
    }

    /// Whether at least one recognized measurement is present.
    pub fn has_fields(&self) -> bool {
        !self.field_names().is_empty()
    }

    /// Names of the measurements present in this record.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.cqi.is_some() {
            names.push("cqi");
        }
        if self.mcs.is_some() {
            names.push("mcs");
        }
        if self.throughput_mbps.is_some() {
            names.push("throughput_mbps");
        }
        if self.bler.is_some() {
            names.push("bler");
        }
        if self.resource_usage.is_some() {
            names.push("resource_usage");
        }
        if self.ue_count.is_some() {
            names.push("ue_count");
        }
        names
    }
}

// ── Decisions ──────────────────────────────────────────────────────

/// Direction of a coding-index change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            other => Err(format!("direction must be 'up' or 'down', got '{other}'")),
        }
    }
}

/// What an action changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Move the modulation and coding scheme index.
    McsAdjustment,
}

/// A proposed state change produced by the decision engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    pub direction: Direction,
    /// Coding index in effect when the action was proposed.
    pub current: u8,
    /// Coding index the action moves to.
    pub target: u8,
    /// Human-readable justification.
    pub reason: String,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mcs {} {} -> {} ({})",
            self.direction, self.current, self.target, self.reason
        )
    }
}

// ── Time ───────────────────────────────────────────────────────────

/// Whole seconds since the Unix epoch.
pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Fractional seconds since the Unix epoch.
pub fn epoch_secs_f64() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
