//! Static-Bounds Threshold Detector
//!
//! ## Overview
//!
//! Edge mode judges each reading on its own, the moment it arrives, against a
//! fixed `{min, max}` pair for its kind:
//!
//! ```text
//!        anomaly   │        normal         │   anomaly
//!   ───────────────●───────────────────────●───────────────
//!                 min                     max
//! ```
//!
//! The interval is closed: `min` and `max` themselves are normal, only values
//! strictly outside raise an anomaly.
//!
//! ## Opt-in Detection
//!
//! Only kinds with configured bounds are checked. Anything else passes
//! through as normal, so adding a new sensor to the fleet never floods the
//! inbox before someone has decided what "abnormal" means for it.
//!
//! ## Usage
//!
//! ```rust
//! use envguard_core::{Reading, SensorKind, ThresholdDetector};
//! use chrono::Utc;
//!
//! let detector = ThresholdDetector::default();
//! let reading = Reading::new(Utc::now(), "office", SensorKind::Temperature, 42.0)?;
//!
//! let verdict = detector.evaluate(&reading);
//! assert!(verdict.is_anomaly);
//! assert_eq!(verdict.reason, "Temperature anomaly at office: 42°C");
//! # Ok::<(), envguard_core::ReadingError>(())
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    constants::thresholds::{HUM_MAX_PCT, HUM_MIN_PCT, TEMP_MAX_C, TEMP_MIN_C},
    errors::ConfigError,
    reading::{Reading, SensorKind},
};

/// Closed `[min, max]` range of normal values for one kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    min: f64,
    max: f64,
}

impl Bounds {
    /// Create bounds, rejecting non-finite or unordered limits
    pub fn new(kind: SensorKind, min: f64, max: f64) -> Result<Self, ConfigError> {
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(ConfigError::InvalidBounds { kind: kind.name(), min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// True if the value lies strictly outside the range
    pub fn is_violated_by(&self, value: f64) -> bool {
        value < self.min || value > self.max
    }
}

/// Outcome of evaluating one reading
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub is_anomaly: bool,
    /// Human-readable explanation; empty for normal readings
    pub reason: String,
}

impl Verdict {
    fn normal() -> Self {
        Self { is_anomaly: false, reason: String::new() }
    }
}

/// Evaluates readings against static per-kind bounds
///
/// Pure and O(1): no history, no side effects.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdDetector {
    bounds: BTreeMap<SensorKind, Bounds>,
}

impl Default for ThresholdDetector {
    /// Office comfort bounds for temperature and humidity; nothing else checked
    fn default() -> Self {
        Self::empty()
            .with_bounds(
                SensorKind::Temperature,
                Bounds { min: TEMP_MIN_C, max: TEMP_MAX_C },
            )
            .with_bounds(
                SensorKind::Humidity,
                Bounds { min: HUM_MIN_PCT, max: HUM_MAX_PCT },
            )
    }
}

impl ThresholdDetector {
    /// Detector that checks no kind at all
    pub fn empty() -> Self {
        Self { bounds: BTreeMap::new() }
    }

    /// Enable (or replace) detection for a kind
    pub fn with_bounds(mut self, kind: SensorKind, bounds: Bounds) -> Self {
        self.bounds.insert(kind, bounds);
        self
    }

    /// Bounds configured for a kind, if detection is enabled for it
    pub fn bounds(&self, kind: SensorKind) -> Option<Bounds> {
        self.bounds.get(&kind).copied()
    }

    /// Judge a single reading
    pub fn evaluate(&self, reading: &Reading) -> Verdict {
        let Some(bounds) = self.bounds.get(&reading.kind()) else {
            return Verdict::normal();
        };

        if !bounds.is_violated_by(reading.value()) {
            return Verdict::normal();
        }

        Verdict {
            is_anomaly: true,
            reason: format!(
                "{} anomaly at {}: {}{}",
                reading.kind().label(),
                reading.source(),
                reading.value(),
                reading.kind().unit(),
            ),
        }
    }
}
