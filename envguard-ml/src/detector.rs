//! Statistical detector: pivot a window of readings and classify each row
//!
//! ## Pivoting
//!
//! The store holds one row per reading. The model wants one row per instant
//! with one column per feature kind:
//!
//! ```text
//! 10:00:00.120 office temperature 21.4        timestamp  temperature humidity
//! 10:00:00.480 office humidity    44.0   ──►  10:00:00   21.4        44.0
//! 10:01:00.090 office temperature 21.5        10:01:00   21.5        -     (not evaluable)
//! ```
//!
//! Timestamps are truncated to the alignment resolution first, since one
//! device publishes its kinds moments apart. Within a slot the latest
//! reading of a kind wins. Slots missing any feature kind are reported as
//! not evaluable: they are neither anomalies nor normal.
//!
//! Slots are fixed, not sliding: two readings 200 ms apart still land in
//! different rows when a slot boundary falls between them. Devices whose
//! publishes straddle boundaries need a coarser alignment.
//!
//! ## Failure Modes
//!
//! An empty window, or a feature kind absent from the whole window, is a
//! setup problem rather than a quiet day, so it is an error and not an
//! empty result.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use envguard_core::{
    constants::alerting::{ALIGNMENT_MILLIS, CONTAMINATION},
    time::align,
    ConfigError, Reading, SensorKind,
};
use thiserror::Error;

use crate::{MLError, OutlierClassifier, Sample};

/// Why a batch window could not be classified
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DetectorError {
    #[error("batch window contains no readings")]
    EmptyWindow,

    #[error("required feature `{0}` is absent from the batch window")]
    MissingFeature(SensorKind),

    #[error("no timestamp in the batch window has every feature kind")]
    NoAlignedRows,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("classifier failed: {0}")]
    Classifier(#[from] MLError),
}

impl DetectorError {
    /// True when the window itself lacked data, as opposed to a broken setup
    pub fn is_missing_data(&self) -> bool {
        matches!(
            self,
            DetectorError::EmptyWindow
                | DetectorError::MissingFeature(_)
                | DetectorError::NoAlignedRows
        )
    }
}

/// Settings for one detection pass
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Kinds that form the feature columns, in column order
    pub feature_kinds: Vec<SensorKind>,
    /// Expected outlier fraction, in (0, 1)
    pub contamination: f64,
    /// Resolution timestamps are truncated to before pivoting
    pub alignment: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            feature_kinds: vec![SensorKind::Temperature, SensorKind::Humidity],
            contamination: CONTAMINATION,
            alignment: Duration::milliseconds(ALIGNMENT_MILLIS),
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feature_kinds.is_empty() {
            return Err(ConfigError::Missing("feature kinds"));
        }
        if !(self.contamination > 0.0 && self.contamination < 1.0) {
            return Err(ConfigError::InvalidContamination(self.contamination));
        }
        if self.alignment < Duration::zero() {
            return Err(ConfigError::Invalid {
                name: "alignment",
                reason: "must not be negative".into(),
            });
        }
        Ok(())
    }
}

/// Verdict for one pivoted row
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Outlier,
    Normal,
    /// The row lacked these feature kinds and was not scored
    NotEvaluable { missing: Vec<SensorKind> },
}

/// Per-row results of a detection pass
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    rows: BTreeMap<DateTime<Utc>, RowOutcome>,
    feature_kinds: Vec<SensorKind>,
    alignment: Duration,
}

impl Detection {
    /// Outcome for an aligned row timestamp
    pub fn outcome(&self, timestamp: DateTime<Utc>) -> Option<&RowOutcome> {
        self.rows.get(&timestamp)
    }

    /// Whether the row a reading landed in was flagged
    ///
    /// `None` when the reading's row was not evaluable, or when its kind is
    /// not a feature of this pass.
    pub fn is_outlier(&self, reading: &Reading) -> Option<bool> {
        if !self.feature_kinds.contains(&reading.kind()) {
            return None;
        }
        match self.rows.get(&align(reading.timestamp(), self.alignment))? {
            RowOutcome::Outlier => Some(true),
            RowOutcome::Normal => Some(false),
            RowOutcome::NotEvaluable { .. } => None,
        }
    }

    /// Flagged row timestamps, ascending
    pub fn outlier_timestamps(&self) -> Vec<DateTime<Utc>> {
        self.rows
            .iter()
            .filter(|(_, outcome)| **outcome == RowOutcome::Outlier)
            .map(|(&timestamp, _)| timestamp)
            .collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = (&DateTime<Utc>, &RowOutcome)> {
        self.rows.iter()
    }

    pub fn evaluated_count(&self) -> usize {
        self.rows
            .values()
            .filter(|o| !matches!(o, RowOutcome::NotEvaluable { .. }))
            .count()
    }

    pub fn outlier_count(&self) -> usize {
        self.rows.values().filter(|o| **o == RowOutcome::Outlier).count()
    }

    pub fn not_evaluable_count(&self) -> usize {
        self.rows.len() - self.evaluated_count()
    }
}

/// One row per aligned timestamp, one value per kind present
pub type PivotTable = BTreeMap<DateTime<Utc>, BTreeMap<SensorKind, f64>>;

/// Pivot readings of the given kinds into rows keyed by aligned timestamp
///
/// Readings of other kinds are ignored. Within a slot, the reading with the
/// latest unaligned timestamp wins; ties go to the one seen last.
pub fn pivot(readings: &[Reading], kinds: &[SensorKind], alignment: Duration) -> PivotTable {
    let mut latest: BTreeMap<DateTime<Utc>, BTreeMap<SensorKind, (DateTime<Utc>, f64)>> =
        BTreeMap::new();

    for reading in readings.iter().filter(|r| kinds.contains(&r.kind())) {
        let slot = latest.entry(align(reading.timestamp(), alignment)).or_default();
        let candidate = (reading.timestamp(), reading.value());
        slot.entry(reading.kind())
            .and_modify(|current| {
                if candidate.0 >= current.0 {
                    *current = candidate;
                }
            })
            .or_insert(candidate);
    }

    latest
        .into_iter()
        .map(|(timestamp, values)| {
            let values = values.into_iter().map(|(kind, (_, value))| (kind, value)).collect();
            (timestamp, values)
        })
        .collect()
}

/// Runs a classifier over pivoted batch windows
#[derive(Debug, Clone)]
pub struct StatisticalDetector<C> {
    classifier: C,
    config: DetectorConfig,
}

impl<C: OutlierClassifier> StatisticalDetector<C> {
    pub fn new(classifier: C, config: DetectorConfig) -> Result<Self, DetectorError> {
        config.validate()?;
        Ok(Self { classifier, config })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Classify every row of the window
    pub fn detect(&mut self, readings: &[Reading]) -> Result<Detection, DetectorError> {
        if readings.is_empty() {
            return Err(DetectorError::EmptyWindow);
        }

        let kinds = &self.config.feature_kinds;
        let table = pivot(readings, kinds, self.config.alignment);

        if let Some(&absent) = kinds
            .iter()
            .find(|kind| !table.values().any(|row| row.contains_key(*kind)))
        {
            return Err(DetectorError::MissingFeature(absent));
        }

        let mut rows = BTreeMap::new();
        let mut scored_at = Vec::new();
        let mut samples = Vec::new();

        for (timestamp, values) in &table {
            let missing: Vec<SensorKind> =
                kinds.iter().copied().filter(|kind| !values.contains_key(kind)).collect();

            if !missing.is_empty() {
                log::debug!("row {timestamp} not evaluable, missing {missing:?}");
                rows.insert(*timestamp, RowOutcome::NotEvaluable { missing });
                continue;
            }

            let features: Vec<f64> = kinds.iter().map(|kind| values[kind]).collect();
            samples.push(Sample::new(&features)?);
            scored_at.push(*timestamp);
        }

        if samples.is_empty() {
            return Err(DetectorError::NoAlignedRows);
        }

        let flags = self.classifier.fit_predict(&samples, self.config.contamination)?;
        if flags.len() != samples.len() {
            return Err(MLError::InvalidConfig("classifier returned a flag count unlike its input").into());
        }

        for (timestamp, is_outlier) in scored_at.into_iter().zip(flags) {
            let outcome = if is_outlier { RowOutcome::Outlier } else { RowOutcome::Normal };
            rows.insert(timestamp, outcome);
        }

        let detection = Detection {
            rows,
            feature_kinds: kinds.clone(),
            alignment: self.config.alignment,
        };

        if detection.not_evaluable_count() > 0 {
            log::warn!(
                "{} of {} rows not evaluable (missing a feature kind)",
                detection.not_evaluable_count(),
                table.len()
            );
        }
        log::info!(
            "classified {} rows, {} outliers",
            detection.evaluated_count(),
            detection.outlier_count()
        );

        Ok(detection)
    }
}
