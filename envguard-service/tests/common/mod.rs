//! Shared fixtures for service integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use envguard_connectors::{Notifier, NotifyError, ReadingStore, StoreError};
use envguard_core::{Notification, Reading, SensorKind};
use envguard_ml::{MLError, OutlierClassifier, Sample};

/// Notifier that keeps every notification it is handed
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Records the attempt, then reports a delivery failure
    pub fn failing() -> Arc<Self> {
        Arc::new(Self { sent: Mutex::default(), fail: true })
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification.clone());
        if self.fail {
            return Err(NotifyError::Rejected("550 mailbox unavailable".into()));
        }
        Ok(())
    }
}

/// Store whose every call fails
#[derive(Debug, Default)]
pub struct BrokenStore;

impl ReadingStore for BrokenStore {
    fn append(&self, _reading: &Reading) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("disk full".into()))
    }

    fn range(
        &self,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
        _source: Option<&str>,
    ) -> Result<Vec<Reading>, StoreError> {
        Err(StoreError::Unavailable("disk full".into()))
    }
}

/// Flags rows whose first feature exceeds a limit
pub struct AboveLimit(pub f64);

impl OutlierClassifier for AboveLimit {
    fn fit_predict(&mut self, features: &[Sample], _contamination: f64) -> Result<Vec<bool>, MLError> {
        Ok(features.iter().map(|s| s.features[0] > self.0).collect())
    }
}

pub fn day() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
}

/// `day()` plus hours and minutes
pub fn at(hour: i64, minute: i64) -> DateTime<Utc> {
    day() + Duration::hours(hour) + Duration::minutes(minute)
}

/// A temperature and a humidity reading for `office`, a few hundred ms apart
pub fn pair(ts: DateTime<Utc>, temperature: f64, humidity: f64) -> [Reading; 2] {
    [
        Reading::new(ts, "office", SensorKind::Temperature, temperature).unwrap(),
        Reading::new(ts + Duration::milliseconds(300), "office", SensorKind::Humidity, humidity).unwrap(),
    ]
}

/// One pair per minute over the day, values in a narrow comfortable band
pub fn quiet_day() -> Vec<Reading> {
    (0..24 * 60)
        .flat_map(|i| {
            let temperature = 21.0 + ((i * 7) % 10) as f64 * 0.1;
            let humidity = 45.0 + ((i * 3) % 10) as f64 * 0.3;
            pair(day() + Duration::minutes(i), temperature, humidity)
        })
        .collect()
}

/// `quiet_day()` with the listed minutes replaced by hot, dry pairs
pub fn day_with_heat_at(minutes: &[i64]) -> Vec<Reading> {
    let mut readings: Vec<Reading> = quiet_day()
        .into_iter()
        .filter(|r| {
            let minute = (r.timestamp() - day()).num_minutes();
            !minutes.contains(&minute)
        })
        .collect();
    for &minute in minutes {
        readings.extend(pair(day() + Duration::minutes(minute), 34.0, 15.0));
    }
    readings
}
