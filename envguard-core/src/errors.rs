//! Error Types for Reading Intake and Configuration
//!
//! ## Error Categories
//!
//! EnvGuard separates failures by how far their damage is allowed to spread:
//!
//! ### Malformed Input
//! - `ReadingError`: a single inbound message could not become a [`Reading`].
//!   The consumer rejects that one message, logs it and keeps going.
//!
//! ### Configuration
//! - `ConfigError`: bounds, windows or rates that make no sense. These are
//!   raised while the process starts and are fatal there.
//!
//! Transport failures (store, mail) live with the adapters that produce them
//! in `envguard-connectors`, and batch-run failures live with the detector in
//! `envguard-ml`.
//!
//! ## Handling Strategy
//!
//! ```rust
//! use envguard_core::{Reading, ReadingError, SensorKind};
//! use chrono::Utc;
//!
//! match Reading::new(Utc::now(), "office", SensorKind::Temperature, f64::NAN) {
//!     Ok(reading) => { /* persist + evaluate */ let _ = reading; }
//!     Err(ReadingError::NonFiniteValue { .. }) => { /* drop, log */ }
//!     Err(_) => { /* drop, log */ }
//! }
//! ```
//!
//! [`Reading`]: crate::Reading

use thiserror::Error;

/// Result type for reading construction and parsing
pub type ReadingResult<T> = Result<T, ReadingError>;

/// A single inbound message could not be turned into a reading
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReadingError {
    /// Topic did not have the `<prefix>/<source>/<kind>` shape
    #[error("topic `{topic}` is missing the {segment} segment")]
    MissingTopicSegment {
        /// The offending topic
        topic: String,
        /// Which segment was absent
        segment: &'static str,
    },

    /// Kind is not part of the recognized set
    #[error("unknown sensor kind `{0}`")]
    UnknownKind(String),

    /// Payload was not a UTF-8 decimal number
    #[error("payload `{payload}` is not a decimal number")]
    InvalidPayload {
        /// Lossy rendering of the payload bytes
        payload: String,
    },

    /// Value parsed but is NaN or infinite
    #[error("value {value} is not finite")]
    NonFiniteValue {
        /// The parsed value
        value: f64,
    },

    /// Source identifier was empty
    #[error("reading has an empty source")]
    EmptySource,
}

/// Invalid configuration, fatal at startup
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// `min`/`max` not finite or not ordered
    #[error("invalid bounds for {kind}: min {min} must be below max {max}")]
    InvalidBounds {
        /// Kind the bounds were configured for
        kind: &'static str,
        /// Configured lower bound
        min: f64,
        /// Configured upper bound
        max: f64,
    },

    /// A duration that has to be positive was zero or negative
    #[error("{name} must be a positive duration")]
    NonPositiveDuration {
        /// Name of the setting
        name: &'static str,
    },

    /// Contamination rate outside (0, 1)
    #[error("contamination {0} must lie strictly between 0 and 1")]
    InvalidContamination(f64),

    /// A required setting (credential, endpoint) was absent
    #[error("missing required setting {0}")]
    Missing(&'static str),

    /// A setting had a value that could not be interpreted
    #[error("invalid value for {name}: {reason}")]
    Invalid {
        /// Name of the setting
        name: &'static str,
        /// What was wrong with it
        reason: String,
    },
}
