//! Default Alert Bounds
//!
//! Comfort ranges for an indoor office. A reading strictly outside the range
//! is anomalous; the bounds themselves are normal.

// ===== TEMPERATURE =====

/// Lowest normal air temperature (°C).
pub const TEMP_MIN_C: f64 = 10.0;

/// Highest normal air temperature (°C).
pub const TEMP_MAX_C: f64 = 40.0;

// ===== HUMIDITY =====

/// Lowest normal relative humidity (%).
///
/// Below this, static discharge and dry-air complaints become common.
pub const HUM_MIN_PCT: f64 = 20.0;

/// Highest normal relative humidity (%).
///
/// Above this, condensation on cold surfaces is likely.
pub const HUM_MAX_PCT: f64 = 80.0;
