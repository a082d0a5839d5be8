//! Sensor Readings - the Unit of Input
//!
//! ## Overview
//!
//! Every inbound message becomes exactly one [`Reading`]. A reading is
//! immutable once built: it is appended to the store once and handed to the
//! threshold detector once. Both consumers see the same value.
//!
//! ```text
//! esp8266/office/temperature  "23.5"
//!          │       │              │
//!        source   kind          value      + timestamp (receive time, UTC)
//! ```
//!
//! ## Recognized Kinds
//!
//! Only kinds in [`SensorKind`] are accepted. Detection is opt-in per kind:
//! a recognized kind without configured bounds (pressure, by default) is
//! stored but never raises an alert.

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ReadingError, ReadingResult};

/// Sensor kind enumeration
///
/// Maps to bounds in the threshold detector and to feature columns in batch mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    Temperature,
    Humidity,
    Pressure,
}

impl SensorKind {
    /// Every recognized kind, in column order
    pub const ALL: [SensorKind; 3] = [
        SensorKind::Temperature,
        SensorKind::Humidity,
        SensorKind::Pressure,
    ];

    /// Wire and storage name
    pub const fn name(&self) -> &'static str {
        match self {
            SensorKind::Temperature => "temperature",
            SensorKind::Humidity => "humidity",
            SensorKind::Pressure => "pressure",
        }
    }

    /// Name with a leading capital, for messages
    pub const fn label(&self) -> &'static str {
        match self {
            SensorKind::Temperature => "Temperature",
            SensorKind::Humidity => "Humidity",
            SensorKind::Pressure => "Pressure",
        }
    }

    /// Expected unit of measurement
    pub const fn unit(&self) -> &'static str {
        match self {
            SensorKind::Temperature => "°C",
            SensorKind::Humidity => "%",
            SensorKind::Pressure => "hPa",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SensorKind {
    type Err = ReadingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SensorKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ReadingError::UnknownKind(s.to_string()))
    }
}

/// One timestamped sample from a sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    timestamp: DateTime<Utc>,
    source: String,
    kind: SensorKind,
    value: f64,
}

impl Reading {
    /// Build a reading, rejecting empty sources and non-finite values
    pub fn new(
        timestamp: DateTime<Utc>,
        source: impl Into<String>,
        kind: SensorKind,
        value: f64,
    ) -> ReadingResult<Self> {
        let source = source.into();
        if source.trim().is_empty() {
            return Err(ReadingError::EmptySource);
        }
        if !value.is_finite() {
            return Err(ReadingError::NonFiniteValue { value });
        }

        Ok(Self { timestamp, source, kind, value })
    }

    /// Parse a UTF-8 decimal payload into a reading
    pub fn from_payload(
        timestamp: DateTime<Utc>,
        source: impl Into<String>,
        kind: SensorKind,
        payload: &[u8],
    ) -> ReadingResult<Self> {
        let invalid = || ReadingError::InvalidPayload {
            payload: String::from_utf8_lossy(payload).into_owned(),
        };

        let text = core::str::from_utf8(payload).map_err(|_| invalid())?;
        let value: f64 = text.trim().parse().map_err(|_| invalid())?;

        Self::new(timestamp, source, kind, value)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Key used for alert suppression
    pub fn alert_key(&self) -> AlertKey {
        AlertKey::new(self.source.clone(), self.kind)
    }
}

/// `(source, kind)` pair identifying one alert stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlertKey {
    pub source: String,
    pub kind: SensorKind,
}

impl AlertKey {
    pub fn new(source: impl Into<String>, kind: SensorKind) -> Self {
        Self { source: source.into(), kind }
    }
}

impl fmt::Display for AlertKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.source, self.kind)
    }
}
