//! Per-Stream Alert Cooldown
//!
//! ## Overview
//!
//! A sensor stuck outside its bounds produces an anomaly on every reading.
//! The [`CooldownTracker`] turns that stream into at most one notification
//! per `(source, kind)` per cooldown window.
//!
//! ```text
//! key office-humidity, window 1h
//!
//! 10:00  anomaly ──► alert      (never alerted)
//! 10:05  anomaly ──► suppressed (5m  ≤ 1h)
//! 10:59  anomaly ──► suppressed (59m ≤ 1h)
//! 11:01  anomaly ──► alert      (61m > 1h)
//! ```
//!
//! A suppressed call does not touch the stored time, so the window is always
//! measured from the last alert that actually went out.
//!
//! ## Concurrency
//!
//! The check and the conditional write happen under one lock acquisition.
//! Two evaluations of the same key racing each other can never both see
//! "should alert" for the same window, whether they come from one consumer
//! loop or from workers sharded by key.
//!
//! ## Persistence
//!
//! State is in memory. Under [`CooldownPolicy::Persisted`] the owner seeds
//! the tracker from stored [`AlertRecord`]s at startup and writes one record
//! per emitted alert; the tracker itself never touches storage.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{constants::alerting::ALERT_COOLDOWN_SECS, reading::AlertKey};

/// Whether suppression state survives a restart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CooldownPolicy {
    /// Memory only; a restart forgets every cooldown
    #[default]
    Volatile,
    /// Seeded from and appended to the store's alert log
    Persisted,
}

/// One emitted alert, as stored under the persisted policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertRecord {
    pub key: AlertKey,
    pub alerted_at: DateTime<Utc>,
}

/// Maps each alert key to the time of its last alert
#[derive(Debug)]
pub struct CooldownTracker {
    window: Duration,
    last_alert: Mutex<HashMap<AlertKey, DateTime<Utc>>>,
}

impl Default for CooldownTracker {
    fn default() -> Self {
        Self::new(Duration::seconds(ALERT_COOLDOWN_SECS))
    }
}

impl CooldownTracker {
    pub fn new(window: Duration) -> Self {
        Self { window, last_alert: Mutex::new(HashMap::new()) }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Decide whether `key` may alert at `now`, recording `now` if so
    pub fn should_alert(&self, key: &AlertKey, now: DateTime<Utc>) -> bool {
        let mut last_alert = self.lock();

        match last_alert.get(key) {
            Some(&last) if now - last <= self.window => {
                log::debug!("{key} cooling down, last alert at {last}");
                false
            }
            _ => {
                last_alert.insert(key.clone(), now);
                true
            }
        }
    }

    /// Preload state, keeping the latest time per key
    pub fn seed<I>(&self, records: I)
    where
        I: IntoIterator<Item = AlertRecord>,
    {
        let mut last_alert = self.lock();
        for record in records {
            last_alert
                .entry(record.key)
                .and_modify(|at| *at = (*at).max(record.alerted_at))
                .or_insert(record.alerted_at);
        }
    }

    /// Time of the last alert emitted for `key`
    pub fn last_alert(&self, key: &AlertKey) -> Option<DateTime<Utc>> {
        self.lock().get(key).copied()
    }

    /// Number of keys that have alerted at least once
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<AlertKey, DateTime<Utc>>> {
        // Every write leaves the map consistent, so a poisoned lock is usable
        self.last_alert.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
