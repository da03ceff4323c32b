//! linktune-engine — coding-index decisions from channel-quality history.
//!
//! # Decision Algorithm
//!
//! ```text
//! history  = last 10 CQI samples, last 10 coding-index samples
//! median   = median(history.cqi)
//! trend    = least-squares slope of history.cqi against sample index
//! low      = cqi_threshold
//! high     = cqi_threshold + 3.0
//!
//! if samples < 3 or now - last_adjustment < interval:
//!     hold
//! if median < low  and mcs > min + 2:                 down 2
//! if median > high and trend >= 0 and mcs < max - 2:  up 2
//! if trend < -0.5 and median < high and mcs > min + 1: down 1
//! ```
//!
//! Targets are clamped to `[mcs_min, mcs_max]`, and the guards keep a rule
//! from firing when the index is already at its bound. The two thresholds
//! give the rules a dead band so the index does not oscillate around a
//! single CQI value.

pub mod engine;
pub mod error;
pub mod history;
pub mod stats;

pub use engine::{DecisionEngine, EngineStatus, Thresholds};
pub use error::{EngineError, EngineResult};
pub use history::HistoryWindow;
