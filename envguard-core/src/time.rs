//! Time management
//!
//! Readings are stamped with the receive time, cooldowns compare against
//! "now", and the batch window ends at "now". All of that goes through a
//! [`Clock`] so tests can drive time by hand:
//! - [`SystemClock`] reads the wall clock (UTC)
//! - [`ManualClock`] holds a settable instant shared between clones

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, DurationRound, Utc};

/// Source of the current instant
pub trait Clock: Send + Sync {
    /// Current time in UTC
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time source
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven time source for tests
///
/// Clones share the same instant, so a test can keep one handle and give the
/// other to the component under test.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Arc::new(Mutex::new(start)) }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.lock() = instant;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.lock();
        *now += by;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        // A poisoned clock still holds a valid instant
        self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.lock()
    }
}

/// Truncate an instant down to a multiple of `resolution`
///
/// Non-positive resolutions leave the instant unchanged.
pub fn align(instant: DateTime<Utc>, resolution: Duration) -> DateTime<Utc> {
    if resolution <= Duration::zero() {
        return instant;
    }
    instant.duration_trunc(resolution).unwrap_or(instant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_is_shared() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        let handle = clock.clone();

        handle.advance(Duration::minutes(5));
        assert_eq!(clock.now(), start + Duration::minutes(5));

        handle.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn align_truncates() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 7).unwrap()
            + Duration::milliseconds(450);
        assert_eq!(
            align(t, Duration::seconds(1)),
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 7).unwrap()
        );
        assert_eq!(
            align(t, Duration::minutes(1)),
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
        );
        assert_eq!(align(t, Duration::zero()), t);
    }
}
