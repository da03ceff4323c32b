//! Sink readiness tracking.
//!
//! Every exchange with the control sink is recorded here. A run of
//! consecutive failures flips the sink to degraded; a single success
//! brings it back.

use serde::Serialize;
use tracing::{debug, warn};

/// Failures in a row before the sink is considered degraded.
pub const DEGRADED_THRESHOLD: u32 = 3;

/// Outcome of one exchange with the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// The sink answered with the expected status.
    Healthy,
    /// The sink answered, but with an unexpected status.
    Unhealthy,
    /// No answer (connect failure, timeout, broken connection).
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Readiness {
    Unknown,
    Ready,
    Degraded,
}

#[derive(Debug, Clone)]
pub struct SinkHealth {
    readiness: Readiness,
    consecutive_failures: u32,
    degraded_threshold: u32,
}

impl Default for SinkHealth {
    fn default() -> Self {
        Self::with_threshold(DEGRADED_THRESHOLD)
    }
}

impl SinkHealth {
    pub fn with_threshold(degraded_threshold: u32) -> Self {
        Self {
            readiness: Readiness::Unknown,
            consecutive_failures: 0,
            degraded_threshold: degraded_threshold.max(1),
        }
    }

    /// Record an exchange and return the resulting readiness.
    pub fn record(&mut self, result: ProbeResult) -> Readiness {
        match result {
            ProbeResult::Healthy => {
                if self.readiness == Readiness::Degraded {
                    debug!(failures = self.consecutive_failures, "control sink recovered");
                }
                self.consecutive_failures = 0;
                self.readiness = Readiness::Ready;
            }
            ProbeResult::Unhealthy | ProbeResult::Failed => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                if self.consecutive_failures >= self.degraded_threshold
                    && self.readiness != Readiness::Degraded
                {
                    warn!(failures = self.consecutive_failures, "control sink degraded");
                    self.readiness = Readiness::Degraded;
                }
            }
        }
        self.readiness
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn is_degraded(&self) -> bool {
        self.readiness == Readiness::Degraded
    }
}
