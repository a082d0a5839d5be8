//! MQTT ingestion
//!
//! Devices publish a bare decimal string on `<prefix>/<source>/<kind>`, e.g.
//! `esp8266/office/temperature` with payload `23.5`. The subscriber listens
//! on `<prefix>/+/<kind>` for each configured kind and forwards every publish
//! into a bounded channel. Subscriptions are re-issued on every ConnAck so a
//! broker restart does not silently end the stream.

use std::time::Duration;

use chrono::{DateTime, Utc};
use envguard_core::{Reading, ReadingError, ReadingResult, SensorKind};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;

use crate::IngestError;

/// Pause between reconnect attempts after a connection error
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Capacity of the client's outgoing request queue
const REQUEST_CAPACITY: usize = 10;

/// Broker connection settings
#[derive(Debug, Clone, PartialEq)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    /// First topic segment shared by all devices
    pub topic_prefix: String,
    pub keep_alive: Duration,
    /// Username and password, when the broker requires them
    pub credentials: Option<(String, String)>,
    /// Kinds to subscribe to, for every source
    pub kinds: Vec<SensorKind>,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 1883,
            client_id: "envguard-edge".into(),
            topic_prefix: "esp8266".into(),
            keep_alive: Duration::from_secs(60),
            credentials: None,
            kinds: vec![SensorKind::Temperature, SensorKind::Humidity],
        }
    }
}

impl MqttConfig {
    /// Wildcard subscription per kind, e.g. `esp8266/+/humidity`
    pub fn topics(&self) -> Vec<String> {
        self.kinds
            .iter()
            .map(|kind| format!("{}/+/{}", self.topic_prefix, kind.name()))
            .collect()
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(self.keep_alive);
        if let Some((username, password)) = &self.credentials {
            options.set_credentials(username, password);
        }
        options
    }
}

/// Raw publish as received, stamped with the receive time
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>, received_at: DateTime<Utc>) -> Self {
        Self { topic: topic.into(), payload: payload.into(), received_at }
    }

    /// Parse topic and payload into a reading stamped with the receive time
    pub fn to_reading(&self) -> ReadingResult<Reading> {
        let (source, kind) = parse_topic(&self.topic)?;
        Reading::from_payload(self.received_at, source, kind, &self.payload)
    }
}

/// Split `<prefix>/<source>/<kind>` into source and kind
pub fn parse_topic(topic: &str) -> ReadingResult<(&str, SensorKind)> {
    let missing = |segment| ReadingError::MissingTopicSegment { topic: topic.to_string(), segment };

    let mut segments = topic.splitn(3, '/');
    segments.next().filter(|s| !s.is_empty()).ok_or_else(|| missing("prefix"))?;
    let source = segments.next().ok_or_else(|| missing("source"))?;
    let kind = segments.next().ok_or_else(|| missing("kind"))?;

    Ok((source, kind.parse()?))
}

/// Long-lived subscription forwarding publishes into a channel
pub struct MqttSubscriber {
    client: AsyncClient,
    eventloop: EventLoop,
    topics: Vec<String>,
}

impl MqttSubscriber {
    /// Prepare the client; nothing connects until [`run`](Self::run)
    pub fn new(config: &MqttConfig) -> Self {
        let (client, eventloop) = AsyncClient::new(config.options(), REQUEST_CAPACITY);
        Self { client, eventloop, topics: config.topics() }
    }

    /// Drive the connection until the receiving side of `tx` is dropped
    ///
    /// Connection errors are logged and retried; the event loop reconnects on
    /// the next poll.
    pub async fn run(mut self, tx: mpsc::Sender<InboundMessage>) -> Result<(), IngestError> {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    log::info!("connected to broker, subscribing to {:?}", self.topics);
                    for topic in &self.topics {
                        self.client.try_subscribe(topic.clone(), QoS::AtLeastOnce)?;
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let message = InboundMessage::new(publish.topic, publish.payload.to_vec(), Utc::now());
                    if tx.send(message).await.is_err() {
                        log::info!("consumer closed, stopping subscriber");
                        return Ok(());
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!("mqtt connection error: {e}, retrying in {RECONNECT_DELAY:?}");
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }
}
