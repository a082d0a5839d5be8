//! Adapters Between EnvGuard and the Outside World
//!
//! ## Overview
//!
//! The detection logic in `envguard-core` and `envguard-ml` never touches a
//! socket or a file. Everything external sits behind one of three seams:
//!
//! | Seam | Trait | Adapters |
//! |------|-------|----------|
//! | Ingestion | channel of [`InboundMessage`] | [`MqttSubscriber`] |
//! | Storage | [`ReadingStore`], [`AlertLog`] | [`SqliteStore`], [`MemoryStore`] |
//! | Notification | [`Notifier`] | [`SmtpNotifier`], [`LogNotifier`] |
//!
//! ### Ingestion
//!
//! Devices publish one decimal value per message on
//! `<prefix>/<source>/<kind>`. The subscriber only moves bytes: it stamps
//! each message with its receive time and pushes it into a bounded channel.
//! Parsing happens on the consumer side so a malformed message is rejected
//! in the same place every other per-reading decision is made.
//!
//! ```text
//! broker ──► MqttSubscriber ──► mpsc (bounded) ──► consumer
//!                                                   ├─► ReadingStore::append
//!                                                   └─► threshold + cooldown ──► Notifier
//! ```
//!
//! ### Storage
//!
//! The store is append-only. Writes are blocking calls; async callers run
//! them on the blocking pool rather than on the event loop.
//!
//! ### Notification
//!
//! Notifiers are async and fallible. A failed send is the caller's to log;
//! nothing here retries.
//!
//! ## Example Usage
//!
//! ```rust
//! use envguard_connectors::{ReadingStore, SqliteStore};
//! use envguard_core::{Reading, SensorKind};
//! use chrono::{Duration, Utc};
//!
//! let store = SqliteStore::open_in_memory()?;
//! let now = Utc::now();
//! store.append(&Reading::new(now, "office", SensorKind::Humidity, 44.0)?)?;
//!
//! let day = store.range(now - Duration::hours(24), now, Some("office"))?;
//! assert_eq!(day.len(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use envguard_core::{AlertRecord, Notification, Reading};
use thiserror::Error;

pub mod memory;
pub mod mqtt;
pub mod notify;
pub mod store;

// Re-export common types
pub use memory::MemoryStore;
pub use mqtt::{parse_topic, InboundMessage, MqttConfig, MqttSubscriber};
pub use notify::{LogNotifier, SmtpConfig, SmtpNotifier};
pub use store::SqliteStore;

/// Store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored row no longer parses into the data model
    #[error("corrupt row in {table}: {reason}")]
    CorruptRow { table: &'static str, reason: String },

    #[error("store lock poisoned")]
    Poisoned,

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Notification delivery failures
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("invalid content type: {0}")]
    ContentType(#[from] lettre::message::header::ContentTypeErr),

    #[error("could not build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("smtp transport failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("notification rejected: {0}")]
    Rejected(String),
}

/// Ingestion failures
///
/// Connection errors are retried inside the subscriber and bad messages are
/// rejected by the consumer, so only a client that can no longer queue
/// requests ends ingestion.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("mqtt client error: {0}")]
    Client(#[from] rumqttc::ClientError),
}

/// Append-only log of readings, queryable by time range
pub trait ReadingStore: Send + Sync {
    fn append(&self, reading: &Reading) -> Result<(), StoreError>;

    /// Readings with `from <= timestamp <= to`, oldest first
    ///
    /// `source` restricts the result to one source; `None` returns all.
    fn range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        source: Option<&str>,
    ) -> Result<Vec<Reading>, StoreError>;
}

/// Durable record of emitted alerts, used to carry cooldowns across restarts
pub trait AlertLog: Send + Sync {
    /// Most recent alert for every source+kind ever alerted on
    fn latest_alerts(&self) -> Result<Vec<AlertRecord>, StoreError>;

    fn record_alert(&self, record: &AlertRecord) -> Result<(), StoreError>;
}

/// Delivers notifications to a person
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}
