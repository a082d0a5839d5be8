//! Anomaly Period Grouping
//!
//! The batch detector flags individual timestamps. A report listing hundreds
//! of them is useless, so consecutive flags are merged into periods:
//!
//! ```text
//! gap = 5m
//!
//! 10:00 10:02          10:10 10:11
//!   ●─────●              ●─────●
//!   └─────┘  8m > 5m     └─────┘
//!  [10:00, 10:02]       [10:10, 10:11]
//! ```
//!
//! Two neighbours stay in one period while the gap between them is at most
//! `gap_threshold`; a gap of exactly the threshold does not split.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::constants::alerting::GAP_THRESHOLD_SECS;

/// Default maximum gap inside one period
pub fn default_gap() -> Duration {
    Duration::seconds(GAP_THRESHOLD_SECS)
}

/// Maximal run of anomalous timestamps, `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnomalyPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl AnomalyPeriod {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Merge ascending timestamps into periods
///
/// The caller sorts; unsorted input yields periods in input order with no
/// merging guarantees. Empty input yields no periods.
pub fn group_periods(timestamps: &[DateTime<Utc>], gap_threshold: Duration) -> Vec<AnomalyPeriod> {
    let Some((&first, rest)) = timestamps.split_first() else {
        return Vec::new();
    };

    let mut periods = Vec::new();
    let mut start = first;
    let mut prev = first;

    for &current in rest {
        if current - prev > gap_threshold {
            periods.push(AnomalyPeriod { start, end: prev });
            start = current;
        }
        prev = current;
    }
    periods.push(AnomalyPeriod { start, end: prev });

    periods
}
