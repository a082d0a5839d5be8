//! Edge mode: evaluate every reading as it arrives
//!
//! ```text
//! MqttSubscriber ──► mpsc ──► EdgeConsumer::handle
//!                               ├─► store.append         (blocking pool, not awaited)
//!                               └─► threshold ──► cooldown ──► notifier (spawned)
//! ```
//!
//! Persisting and alerting are independent: a failed append does not stop
//! the alert, and a failed send does not stop the next reading. Both are
//! logged and forgotten.

use std::fmt;
use std::sync::Arc;

use envguard_connectors::{AlertLog, InboundMessage, MqttConfig, MqttSubscriber, Notifier, ReadingStore};
use envguard_core::{AlertRecord, CooldownPolicy, CooldownTracker, Notification, Reading, ReadingError, ThresholdDetector};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::config::EdgeSettings;
use crate::error::ServiceResult;

/// What happened to one inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeStatus {
    /// Stored, within bounds
    Ingested(Reading),
    /// Out of bounds and a notification went out
    Anomaly { reading: Reading, reason: String },
    /// Out of bounds but the key is cooling down
    Suppressed { reading: Reading, reason: String },
    /// Could not be parsed into a reading
    Rejected { topic: String, error: ReadingError },
}

impl fmt::Display for EdgeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeStatus::Ingested(r) => write!(f, "ingested {} {} = {}", r.source(), r.kind(), r.value()),
            EdgeStatus::Anomaly { reason, .. } => write!(f, "anomaly detected: {reason}"),
            EdgeStatus::Suppressed { reason, .. } => write!(f, "suppressed (cooldown): {reason}"),
            EdgeStatus::Rejected { topic, error } => write!(f, "rejected message on {topic}: {error}"),
        }
    }
}

/// Single evaluation loop behind the ingestion channel
pub struct EdgeConsumer {
    detector: ThresholdDetector,
    cooldown: Arc<CooldownTracker>,
    store: Arc<dyn ReadingStore>,
    alert_log: Option<Arc<dyn AlertLog>>,
    notifier: Arc<dyn Notifier>,
    tasks: JoinSet<()>,
}

impl EdgeConsumer {
    pub fn new(settings: &EdgeSettings, store: Arc<dyn ReadingStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            detector: settings.detector.clone(),
            cooldown: Arc::new(CooldownTracker::new(settings.cooldown)),
            store,
            alert_log: None,
            notifier,
            tasks: JoinSet::new(),
        }
    }

    /// Record every emitted alert here (persisted cooldown policy)
    pub fn with_alert_log(mut self, alert_log: Arc<dyn AlertLog>) -> Self {
        self.alert_log = Some(alert_log);
        self
    }

    pub fn cooldown(&self) -> &CooldownTracker {
        &self.cooldown
    }

    /// Seed the cooldown tracker from the alert log; returns the keys loaded
    pub async fn restore_cooldowns(&self) -> ServiceResult<usize> {
        let Some(alert_log) = self.alert_log.clone() else {
            return Ok(0);
        };

        let records = tokio::task::spawn_blocking(move || alert_log.latest_alerts()).await??;
        let restored = records.len();
        self.cooldown.seed(records);
        tracing::info!(restored, "cooldowns restored from alert log");
        Ok(restored)
    }

    /// Process one message; side effects run in the background
    pub fn handle(&mut self, message: InboundMessage) -> EdgeStatus {
        self.reap();

        let reading = match message.to_reading() {
            Ok(reading) => reading,
            Err(error) => {
                let status = EdgeStatus::Rejected { topic: message.topic, error };
                tracing::warn!("{status}");
                return status;
            }
        };

        self.persist(reading.clone());

        let verdict = self.detector.evaluate(&reading);
        if !verdict.is_anomaly {
            let status = EdgeStatus::Ingested(reading);
            tracing::info!("{status}");
            return status;
        }

        let key = reading.alert_key();
        if !self.cooldown.should_alert(&key, reading.timestamp()) {
            let status = EdgeStatus::Suppressed { reading, reason: verdict.reason };
            tracing::warn!("{status}");
            return status;
        }

        self.notify(Notification::alert(&verdict));
        if let Some(alert_log) = self.alert_log.clone() {
            let record = AlertRecord { key, alerted_at: reading.timestamp() };
            self.tasks.spawn_blocking(move || {
                if let Err(e) = alert_log.record_alert(&record) {
                    tracing::error!(key = %record.key, "failed to record alert: {e}");
                }
            });
        }

        let status = EdgeStatus::Anomaly { reading, reason: verdict.reason };
        tracing::warn!("{status}");
        status
    }

    /// Consume until the channel closes
    pub async fn run(mut self, mut rx: mpsc::Receiver<InboundMessage>) {
        while let Some(message) = rx.recv().await {
            self.handle(message);
        }
        tracing::info!("ingestion channel closed");
        self.drain().await;
    }

    /// Wait for every outstanding store write and notification
    pub async fn drain(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            log_join(result);
        }
    }

    fn persist(&mut self, reading: Reading) {
        let store = self.store.clone();
        self.tasks.spawn_blocking(move || {
            if let Err(e) = store.append(&reading) {
                tracing::error!(source = reading.source(), kind = %reading.kind(), "failed to persist reading: {e}");
            }
        });
    }

    fn notify(&mut self, notification: Notification) {
        let notifier = self.notifier.clone();
        self.tasks.spawn(async move {
            match notifier.send(&notification).await {
                Ok(()) => tracing::info!(subject = %notification.subject, "alert sent"),
                Err(e) => tracing::error!("failed to send alert: {e}"),
            }
        });
    }

    fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            log_join(result);
        }
    }
}

fn log_join(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        tracing::error!("background task failed: {e}");
    }
}

/// Run edge mode; returns only if the subscription stops
pub async fn run_edge(
    settings: EdgeSettings,
    mqtt: MqttConfig,
    store: Arc<dyn ReadingStore>,
    alert_log: Arc<dyn AlertLog>,
    notifier: Arc<dyn Notifier>,
) -> ServiceResult<()> {
    let mut consumer = EdgeConsumer::new(&settings, store, notifier);
    if settings.cooldown_policy == CooldownPolicy::Persisted {
        consumer = consumer.with_alert_log(alert_log);
        consumer.restore_cooldowns().await?;
    }

    let (tx, rx) = mpsc::channel(settings.channel_capacity);
    let subscriber = tokio::spawn(MqttSubscriber::new(&mqtt).run(tx));
    tracing::info!(host = %mqtt.host, port = mqtt.port, topics = ?mqtt.topics(), "edge consumer started");

    consumer.run(rx).await;
    subscriber.await??;
    Ok(())
}
