//! Common test utilities and data generators for integration tests

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use envguard_core::{Reading, SensorKind};

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
}

/// Produces a reading stream for one source and kind at a fixed period
pub struct StreamGenerator {
    source: String,
    kind: SensorKind,
    period: Duration,
    baseline: f64,
    /// `(first step, last step, value)` overrides
    excursions: Vec<(usize, usize, f64)>,
}

impl StreamGenerator {
    pub fn new(source: &str, kind: SensorKind, period: Duration, baseline: f64) -> Self {
        Self { source: source.into(), kind, period, baseline, excursions: Vec::new() }
    }

    /// Hold `value` from step `first` through step `last`
    pub fn excursion(mut self, first: usize, last: usize, value: f64) -> Self {
        self.excursions.push((first, last, value));
        self
    }

    pub fn take(&self, steps: usize) -> Vec<Reading> {
        (0..steps)
            .map(|step| {
                let value = self
                    .excursions
                    .iter()
                    .find(|(first, last, _)| (*first..=*last).contains(&step))
                    .map_or(self.baseline, |(_, _, value)| *value);
                let ts = start() + self.period * step as i32;
                Reading::new(ts, self.source.clone(), self.kind, value).unwrap()
            })
            .collect()
    }
}
