//! SQLite-backed reading store and alert log
//!
//! One connection behind a mutex serves both reads and writes. Callers on an
//! async runtime are expected to invoke it from the blocking pool.
//!
//! Timestamps are stored as RFC 3339 UTC text with fixed millisecond
//! precision, so lexicographic order is time order and the `timestamp`
//! index serves range scans directly.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use envguard_core::{AlertKey, AlertRecord, Reading, SensorKind};
use rusqlite::{params, Connection};

use crate::{AlertLog, ReadingStore, StoreError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sensor_data (
    timestamp TEXT NOT NULL,
    source    TEXT NOT NULL,
    kind      TEXT NOT NULL,
    value     REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_sensor_data_timestamp ON sensor_data(timestamp);

CREATE TABLE IF NOT EXISTS alert_log (
    source     TEXT NOT NULL,
    kind       TEXT NOT NULL,
    alerted_at TEXT NOT NULL
);
";

/// Reading store and alert log in one SQLite database
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file and ensure the schema exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        Self::init(conn)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl ReadingStore for SqliteStore {
    fn append(&self, reading: &Reading) -> Result<(), StoreError> {
        self.conn()?.execute(
            "INSERT INTO sensor_data (timestamp, source, kind, value) VALUES (?1, ?2, ?3, ?4)",
            params![
                encode_time(reading.timestamp()),
                reading.source(),
                reading.kind().name(),
                reading.value()
            ],
        )?;
        Ok(())
    }

    fn range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        source: Option<&str>,
    ) -> Result<Vec<Reading>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT timestamp, source, kind, value FROM sensor_data
             WHERE timestamp >= ?1 AND timestamp <= ?2 AND (?3 IS NULL OR source = ?3)
             ORDER BY timestamp, rowid",
        )?;

        let rows = stmt.query_map(params![encode_time(from), encode_time(to), source], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })?;

        let mut readings = Vec::new();
        for row in rows {
            let (timestamp, source, kind, value) = row?;
            let reading = Reading::new(
                decode_time("sensor_data", &timestamp)?,
                source,
                decode_kind("sensor_data", &kind)?,
                value,
            )
            .map_err(|e| corrupt("sensor_data", e))?;
            readings.push(reading);
        }

        log::debug!("range query returned {} readings", readings.len());
        Ok(readings)
    }
}

impl AlertLog for SqliteStore {
    fn latest_alerts(&self) -> Result<Vec<AlertRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT source, kind, MAX(alerted_at) FROM alert_log GROUP BY source, kind",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let records = rows
            .map(|row| -> Result<AlertRecord, StoreError> {
                let (source, kind, alerted_at) = row?;
                Ok(AlertRecord {
                    key: AlertKey::new(source, decode_kind("alert_log", &kind)?),
                    alerted_at: decode_time("alert_log", &alerted_at)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn record_alert(&self, record: &AlertRecord) -> Result<(), StoreError> {
        self.conn()?.execute(
            "INSERT INTO alert_log (source, kind, alerted_at) VALUES (?1, ?2, ?3)",
            params![
                record.key.source,
                record.key.kind.name(),
                encode_time(record.alerted_at)
            ],
        )?;
        Ok(())
    }
}

fn encode_time(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn decode_time(table: &'static str, text: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| corrupt(table, format!("timestamp `{text}`: {e}")))
}

fn decode_kind(table: &'static str, text: &str) -> Result<SensorKind, StoreError> {
    text.parse().map_err(|e| corrupt(table, e))
}

fn corrupt(table: &'static str, reason: impl ToString) -> StoreError {
    StoreError::CorruptRow { table, reason: reason.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, minute, 0).unwrap()
    }

    fn reading(ts: DateTime<Utc>, source: &str, kind: SensorKind, value: f64) -> Reading {
        Reading::new(ts, source, kind, value).unwrap()
    }

    #[test]
    fn range_is_inclusive_and_ordered() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.append(&reading(at(5), "office", SensorKind::Humidity, 44.0)).unwrap();
        store.append(&reading(at(1), "office", SensorKind::Temperature, 21.0)).unwrap();
        store.append(&reading(at(9), "office", SensorKind::Temperature, 22.0)).unwrap();
        store.append(&reading(at(20), "office", SensorKind::Temperature, 23.0)).unwrap();

        let found = store.range(at(1), at(9), None).unwrap();
        let times: Vec<_> = found.iter().map(|r| r.timestamp()).collect();
        assert_eq!(times, vec![at(1), at(5), at(9)]);
        assert_eq!(found[1].kind(), SensorKind::Humidity);
        assert_eq!(found[1].value(), 44.0);
    }

    #[test]
    fn source_filter() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.append(&reading(at(1), "office", SensorKind::Temperature, 21.0)).unwrap();
        store.append(&reading(at(2), "lab", SensorKind::Temperature, 19.0)).unwrap();

        let office = store.range(at(0), at(10), Some("office")).unwrap();
        assert_eq!(office.len(), 1);
        assert_eq!(office[0].source(), "office");
        assert_eq!(store.range(at(0), at(10), None).unwrap().len(), 2);
    }

    #[test]
    fn millisecond_precision_survives() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ts = at(3) + Duration::milliseconds(250);
        store.append(&reading(ts, "office", SensorKind::Pressure, 1013.2)).unwrap();

        let found = store.range(ts, ts, None).unwrap();
        assert_eq!(found[0].timestamp(), ts);
    }

    #[test]
    fn alert_log_keeps_latest_per_key() {
        let store = SqliteStore::open_in_memory().unwrap();
        let humidity = AlertKey::new("office", SensorKind::Humidity);
        let temperature = AlertKey::new("office", SensorKind::Temperature);

        for (key, minute) in [(&humidity, 1), (&humidity, 7), (&temperature, 3)] {
            store
                .record_alert(&AlertRecord { key: key.clone(), alerted_at: at(minute) })
                .unwrap();
        }

        let mut latest = store.latest_alerts().unwrap();
        latest.sort_by(|a, b| a.key.cmp(&b.key));
        assert_eq!(
            latest,
            vec![
                AlertRecord { key: temperature, alerted_at: at(3) },
                AlertRecord { key: humidity, alerted_at: at(7) },
            ]
        );
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edge_data.sqlite3");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.append(&reading(at(1), "office", SensorKind::Humidity, 50.0)).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.range(at(0), at(2), Some("office")).unwrap().len(), 1);
    }

    #[test]
    fn unknown_kind_in_table_is_corrupt() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .conn()
            .unwrap()
            .execute(
                "INSERT INTO sensor_data VALUES (?1, 'office', 'co2', 400.0)",
                params![encode_time(at(1))],
            )
            .unwrap();

        assert!(matches!(
            store.range(at(0), at(2), None),
            Err(StoreError::CorruptRow { table: "sensor_data", .. })
        ));
    }
}
