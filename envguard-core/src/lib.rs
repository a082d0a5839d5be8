//! Core detection engine for EnvGuard
//!
//! Decides which environmental readings are abnormal and which of those are
//! worth telling someone about.
//!
//! - [`ThresholdDetector`]: static per-kind bounds, one reading at a time (edge mode)
//! - [`CooldownTracker`]: at most one alert per source+kind per window
//! - [`group_periods`]: merges flagged timestamps into contiguous periods (batch mode)
//! - [`ReportRenderer`]: turns periods into the daily report
//!
//! Transport, storage and the statistical model live in sibling crates; this
//! one only holds the decision logic and the data model they share.
//!
//! ```no_run
//! use envguard_core::{CooldownTracker, Reading, SensorKind, ThresholdDetector};
//! use chrono::Utc;
//!
//! let detector = ThresholdDetector::default();
//! let cooldown = CooldownTracker::default();
//!
//! let reading = Reading::new(Utc::now(), "office", SensorKind::Humidity, 91.0)?;
//! let verdict = detector.evaluate(&reading);
//! if verdict.is_anomaly && cooldown.should_alert(&reading.alert_key(), reading.timestamp()) {
//!     // hand verdict.reason to a notifier
//! }
//! # Ok::<(), envguard_core::ReadingError>(())
//! ```

#![deny(unsafe_code)]

pub mod constants;
pub mod cooldown;
pub mod errors;
pub mod periods;
pub mod reading;
pub mod report;
pub mod threshold;
pub mod time;

// Public API
pub use cooldown::{AlertRecord, CooldownPolicy, CooldownTracker};
pub use errors::{ConfigError, ReadingError, ReadingResult};
pub use periods::{default_gap, group_periods, AnomalyPeriod};
pub use reading::{AlertKey, Reading, SensorKind};
pub use report::{Attachment, Notification, ReportRenderer};
pub use threshold::{Bounds, ThresholdDetector, Verdict};
pub use time::{Clock, ManualClock, SystemClock};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
