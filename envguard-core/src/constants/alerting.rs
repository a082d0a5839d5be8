//! Alerting and Batch Analysis Defaults

/// Minimum time between two notifications for one source+kind (seconds).
pub const ALERT_COOLDOWN_SECS: i64 = 60 * 60;

/// Length of the window the batch job re-analyzes (hours).
pub const BATCH_WINDOW_HOURS: i64 = 24;

/// Largest gap between anomalies that still belong to one period (seconds).
///
/// A gap exactly this long does not split a period.
pub const GAP_THRESHOLD_SECS: i64 = 5 * 60;

/// Expected fraction of a batch window flagged as outliers.
pub const CONTAMINATION: f64 = 0.05;

/// Seed for the outlier model, fixed so reruns flag the same rows.
pub const RANDOM_SEED: u64 = 42;

/// Resolution timestamps are truncated to before pivoting (milliseconds).
///
/// A device publishes its temperature and humidity moments apart; one second
/// puts both into the same row.
pub const ALIGNMENT_MILLIS: i64 = 1_000;

/// Source analyzed by the batch job when none is configured.
pub const BATCH_SOURCE: &str = "office";
