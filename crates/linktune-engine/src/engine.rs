//! Decision engine. Turns telemetry history into coding-index actions.
//!
//! The engine owns the controller state: the current coding index, the
//! observation history, and the time of the last automatic adjustment.
//! The current index only changes after a sink confirms a dispatch.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use linktune_core::{Action, ActionKind, CommandSink, Direction, EngineConfig, MetricRecord, epoch_secs};

use crate::error::{EngineError, EngineResult};
use crate::history::HistoryWindow;
use crate::stats::{median, trend};

/// Observations kept per history window.
pub const HISTORY_CAPACITY: usize = 10;

/// CQI observations required before any rule is evaluated.
pub const MIN_HISTORY: usize = 3;

/// Distance between the low and high CQI thresholds.
pub const HYSTERESIS_SPAN: f64 = 3.0;

/// Slope below which a falling CQI triggers a preemptive step down.
pub const DECLINE_SLOPE: f64 = -0.5;

/// Low/high CQI thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub cqi_low: f64,
    pub cqi_high: f64,
}

/// Read-only snapshot of the engine, for external inspection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStatus {
    pub current_mcs: u8,
    pub cqi_history: Vec<f64>,
    pub mcs_history: Vec<i32>,
    pub median_cqi: f64,
    pub cqi_trend: f64,
    pub thresholds: Thresholds,
    pub mcs_min: u8,
    pub mcs_max: u8,
    /// Unix timestamp (seconds) of the last automatic adjustment.
    pub last_adjustment: Option<u64>,
    pub adjustment_interval_secs: u64,
}

/// Trend-based coding-index controller with hysteresis and rate limiting.
#[derive(Debug)]
pub struct DecisionEngine {
    config: EngineConfig,
    thresholds: Thresholds,
    cqi_history: HistoryWindow<f64>,
    mcs_history: HistoryWindow<i32>,
    current_mcs: u8,
    last_adjustment: Option<u64>,
}

impl DecisionEngine {
    pub fn new(config: EngineConfig) -> Self {
        let thresholds = Thresholds {
            cqi_low: config.cqi_threshold,
            cqi_high: config.cqi_threshold + HYSTERESIS_SPAN,
        };
        let current_mcs = config.initial_mcs.max(config.mcs_min).min(config.mcs_max);

        info!(
            cqi_low = thresholds.cqi_low,
            cqi_high = thresholds.cqi_high,
            mcs = current_mcs,
            "decision engine initialized"
        );

        Self {
            config,
            thresholds,
            cqi_history: HistoryWindow::new(HISTORY_CAPACITY),
            mcs_history: HistoryWindow::new(HISTORY_CAPACITY),
            current_mcs,
            last_adjustment: None,
        }
    }

    pub fn current_mcs(&self) -> u8 {
        self.current_mcs
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Feed one record and decide whether to act, using the wall clock.
    pub fn process(&mut self, record: &MetricRecord) -> Option<Action> {
        self.process_at(record, epoch_secs())
    }

    /// Feed one record and decide whether to act at time `now` (epoch seconds).
    ///
    /// The record always enters the history, even when the cold-start gate
    /// or the rate limit holds the decision back. A proposed action stamps
    /// the last-adjustment time immediately, whether or not it is applied.
    pub fn process_at(&mut self, record: &MetricRecord, now: u64) -> Option<Action> {
        if let Some(cqi) = record.cqi {
            self.cqi_history.push(cqi);
        }
        self.mcs_history
            .push(record.mcs.unwrap_or(i32::from(self.current_mcs)));

        if self.cqi_history.len() < MIN_HISTORY {
            debug!(
                samples = self.cqi_history.len(),
                required = MIN_HISTORY,
                "collecting cqi history"
            );
            return None;
        }

        if let Some(last) = self.last_adjustment
            && Duration::from_secs(now.saturating_sub(last)) < self.config.adjustment_interval
        {
            debug!(last_adjustment = last, now, "rate limited");
            return None;
        }

        let window = self.cqi_history.to_vec();
        let median_cqi = median(&window);
        let cqi_trend = trend(&window);

        debug!(
            cqi = ?record.cqi,
            median = median_cqi,
            trend = cqi_trend,
            mcs = self.current_mcs,
            "cqi stats"
        );

        let action = self.decide(median_cqi, cqi_trend)?;
        self.last_adjustment = Some(now);
        info!(
            direction = %action.direction,
            from = action.current,
            to = action.target,
            reason = %action.reason,
            "adjustment proposed"
        );
        Some(action)
    }

    /// Evaluate the rules in precedence order; the first match wins.
    fn decide(&self, median_cqi: f64, cqi_trend: f64) -> Option<Action> {
        let current = i32::from(self.current_mcs);
        let min = i32::from(self.config.mcs_min);
        let max = i32::from(self.config.mcs_max);
        let Thresholds { cqi_low, cqi_high } = self.thresholds;

        if median_cqi < cqi_low && current > min + 2 {
            return Some(self.propose(
                Direction::Down,
                current - 2,
                format!("Low CQI ({median_cqi:.1}) - reducing MCS for reliability"),
            ));
        }

        if median_cqi > cqi_high && cqi_trend >= 0.0 && current < max - 2 {
            return Some(self.propose(
                Direction::Up,
                current + 2,
                format!("High CQI ({median_cqi:.1}) - increasing MCS for throughput"),
            ));
        }

        if cqi_trend < DECLINE_SLOPE && median_cqi < cqi_high && current > min + 1 {
            return Some(self.propose(
                Direction::Down,
                current - 1,
                format!("Declining CQI trend ({cqi_trend:.2}) - preemptive MCS reduction"),
            ));
        }

        None
    }

    fn propose(&self, direction: Direction, target: i32, reason: String) -> Action {
        let min = i32::from(self.config.mcs_min);
        let max = i32::from(self.config.mcs_max);
        let target = target.max(min).min(max) as u8;
        debug_assert!(self.in_bounds(target));

        Action {
            kind: ActionKind::McsAdjustment,
            direction,
            current: self.current_mcs,
            target,
            reason,
        }
    }

    fn in_bounds(&self, mcs: u8) -> bool {
        (self.config.mcs_min..=self.config.mcs_max).contains(&mcs)
    }

    /// Dispatch an action's target and commit it if the sink accepts.
    ///
    /// Returns `Ok(false)` when the sink rejects; state is unchanged then.
    /// The last-adjustment time set by `process` is not rolled back.
    pub async fn apply<S: CommandSink>(&mut self, action: Action, sink: &mut S) -> EngineResult<bool> {
        if !self.in_bounds(action.target) {
            return Err(EngineError::BoundaryViolation {
                target: action.target,
                min: self.config.mcs_min,
                max: self.config.mcs_max,
            });
        }

        if sink.send_adjustment(action.target).await {
            info!(from = self.current_mcs, to = action.target, "mcs adjusted");
            self.current_mcs = action.target;
            Ok(true)
        } else {
            warn!(to = action.target, direction = %action.direction, "action dispatch failed");
            Ok(false)
        }
    }

    /// Move the coding index one step in `direction`.
    ///
    /// Returns `false` without side effects when the index is already at the
    /// bound or the sink rejects the command.
    pub async fn adjust<S: CommandSink>(&mut self, direction: Direction, sink: &mut S) -> bool {
        let target = match direction {
            Direction::Up => self.current_mcs.saturating_add(1).min(self.config.mcs_max),
            Direction::Down => self.current_mcs.saturating_sub(1).max(self.config.mcs_min),
        };

        if target == self.current_mcs {
            warn!(mcs = self.current_mcs, %direction, "mcs already at limit");
            return false;
        }

        if sink.send_adjustment(target).await {
            info!(from = self.current_mcs, to = target, "mcs adjusted");
            self.current_mcs = target;
            true
        } else {
            error!(to = target, "failed to adjust mcs");
            false
        }
    }

    pub fn status(&self) -> EngineStatus {
        let window = self.cqi_history.to_vec();
        EngineStatus {
            current_mcs: self.current_mcs,
            median_cqi: median(&window),
            cqi_trend: trend(&window),
            cqi_history: window,
            mcs_history: self.mcs_history.to_vec(),
            thresholds: self.thresholds,
            mcs_min: self.config.mcs_min,
            mcs_max: self.config.mcs_max,
            last_adjustment: self.last_adjustment,
            adjustment_interval_secs: self.config.adjustment_interval.as_secs(),
        }
    }
}
