//! Constants for EnvGuard Core
//!
//! Defaults for every tunable in the system live here, so the detection
//! code never carries magic numbers. All of them can be overridden through
//! process configuration; these are only the values used when nothing is
//! supplied.
//!
//! ## Organization
//!
//! - **Thresholds**: static per-kind bounds used in edge mode
//! - **Alerting**: cooldown, batch window, grouping and model defaults

/// Static bounds for the threshold detector.
pub mod thresholds;

/// Cooldown, batch window, period grouping and outlier model defaults.
pub mod alerting;
