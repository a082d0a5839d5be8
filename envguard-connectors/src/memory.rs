//! In-memory store for tests and dry runs

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use envguard_core::{AlertRecord, Reading};

use crate::{AlertLog, ReadingStore, StoreError};

/// Volatile [`ReadingStore`] and [`AlertLog`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    readings: Mutex<Vec<Reading>>,
    alerts: Mutex<Vec<AlertRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with readings
    pub fn with_readings(readings: impl IntoIterator<Item = Reading>) -> Self {
        let store = Self::default();
        store.lock_readings().extend(readings);
        store
    }

    /// Every reading appended so far, in append order
    pub fn readings(&self) -> Vec<Reading> {
        self.lock_readings().clone()
    }

    /// Every alert recorded so far, in record order
    pub fn alerts(&self) -> Vec<AlertRecord> {
        lock(&self.alerts).clone()
    }

    fn lock_readings(&self) -> MutexGuard<'_, Vec<Reading>> {
        lock(&self.readings)
    }
}

impl ReadingStore for MemoryStore {
    fn append(&self, reading: &Reading) -> Result<(), StoreError> {
        self.lock_readings().push(reading.clone());
        Ok(())
    }

    fn range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        source: Option<&str>,
    ) -> Result<Vec<Reading>, StoreError> {
        let mut found: Vec<Reading> = self
            .lock_readings()
            .iter()
            .filter(|r| r.timestamp() >= from && r.timestamp() <= to)
            .filter(|r| source.map_or(true, |s| r.source() == s))
            .cloned()
            .collect();
        // Stable, so equal timestamps keep append order
        found.sort_by_key(|r| r.timestamp());
        Ok(found)
    }
}

impl AlertLog for MemoryStore {
    fn latest_alerts(&self) -> Result<Vec<AlertRecord>, StoreError> {
        let mut latest: Vec<AlertRecord> = Vec::new();
        for record in lock(&self.alerts).iter() {
            match latest.iter_mut().find(|r| r.key == record.key) {
                Some(existing) if existing.alerted_at < record.alerted_at => {
                    existing.alerted_at = record.alerted_at;
                }
                Some(_) => {}
                None => latest.push(record.clone()),
            }
        }
        Ok(latest)
    }

    fn record_alert(&self, record: &AlertRecord) -> Result<(), StoreError> {
        lock(&self.alerts).push(record.clone());
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use envguard_core::{AlertKey, SensorKind};

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, minute, 0).unwrap()
    }

    #[test]
    fn range_matches_sqlite_semantics() {
        let store = MemoryStore::with_readings([
            Reading::new(at(4), "office", SensorKind::Humidity, 40.0).unwrap(),
            Reading::new(at(2), "office", SensorKind::Temperature, 21.0).unwrap(),
            Reading::new(at(3), "lab", SensorKind::Temperature, 19.0).unwrap(),
            Reading::new(at(8), "office", SensorKind::Temperature, 22.0).unwrap(),
        ]);

        let office: Vec<_> = store
            .range(at(2), at(4), Some("office"))
            .unwrap()
            .iter()
            .map(|r| r.timestamp())
            .collect();
        assert_eq!(office, vec![at(2), at(4)]);
        assert_eq!(store.range(at(0), at(9), None).unwrap().len(), 4);
    }

    #[test]
    fn latest_alert_per_key() {
        let store = MemoryStore::new();
        let key = AlertKey::new("office", SensorKind::Humidity);
        for minute in [5, 2, 9] {
            store.record_alert(&AlertRecord { key: key.clone(), alerted_at: at(minute) }).unwrap();
        }

        assert_eq!(
            store.latest_alerts().unwrap(),
            vec![AlertRecord { key, alerted_at: at(9) }]
        );
        assert_eq!(store.alerts().len(), 3);
    }
}
