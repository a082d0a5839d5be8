//! Batch mode: daily statistical report
//!
//! One run reads the trailing window from the store, flags outlier rows,
//! merges flagged timestamps into periods and mails the rendered report.
//! Runs are sequential; a scheduled job awaits each run before the next
//! tick, so two runs never overlap and a failed run simply waits for the
//! next one.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use envguard_connectors::{Notifier, ReadingStore};
use envguard_core::{group_periods, AnomalyPeriod, Clock, ReportRenderer};
use envguard_ml::{IsolationForestClassifier, OutlierClassifier, StatisticalDetector};
use tokio::time::MissedTickBehavior;

use crate::config::BatchSettings;
use crate::error::BatchError;

/// What a successful run found and reported
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub readings: usize,
    /// Rows that had every feature kind
    pub evaluated: usize,
    pub outliers: usize,
    pub periods: Vec<AnomalyPeriod>,
}

pub struct BatchJob<C> {
    settings: BatchSettings,
    detector: StatisticalDetector<C>,
    renderer: ReportRenderer,
    store: Arc<dyn ReadingStore>,
    notifier: Arc<dyn Notifier>,
}

impl BatchJob<IsolationForestClassifier> {
    /// Job using the Isolation Forest classifier
    pub fn new(
        settings: BatchSettings,
        store: Arc<dyn ReadingStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, BatchError> {
        let classifier = IsolationForestClassifier::new(settings.forest.clone());
        Self::with_classifier(classifier, settings, store, notifier)
    }
}

impl<C: OutlierClassifier> BatchJob<C> {
    pub fn with_classifier(
        classifier: C,
        settings: BatchSettings,
        store: Arc<dyn ReadingStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, BatchError> {
        let detector = StatisticalDetector::new(classifier, settings.detector.clone())?;
        let renderer = ReportRenderer::new(settings.source.as_deref().unwrap_or(""), settings.window);
        Ok(Self { settings, detector, renderer, store, notifier })
    }

    /// Analyze `[now - window, now]` and send the report
    pub async fn run_once(&mut self, now: DateTime<Utc>) -> Result<BatchSummary, BatchError> {
        let from = now - self.settings.window;
        let store = self.store.clone();
        let source = self.settings.source.clone();
        let readings =
            tokio::task::spawn_blocking(move || store.range(from, now, source.as_deref())).await??;

        tracing::info!(readings = readings.len(), %from, to = %now, "batch window loaded");

        let detection = self.detector.detect(&readings)?;
        let periods = group_periods(&detection.outlier_timestamps(), self.settings.gap);

        self.notifier.send(&self.renderer.notification(&periods)).await?;

        Ok(BatchSummary {
            readings: readings.len(),
            evaluated: detection.evaluated_count(),
            outliers: detection.outlier_count(),
            periods,
        })
    }

    /// Run now and then every `every`, forever
    pub async fn run_every(&mut self, clock: Arc<dyn Clock>, every: std::time::Duration) {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            let outcome = self.run_once(clock.now()).await;
            report_outcome(&outcome);
        }
    }
}

/// Log the one-line verdict of a run
pub fn report_outcome(outcome: &Result<BatchSummary, BatchError>) {
    match outcome {
        Ok(summary) => tracing::info!(
            readings = summary.readings,
            outliers = summary.outliers,
            "batch report sent: {} anomaly period(s)",
            summary.periods.len()
        ),
        Err(e) if e.is_missing_data() => tracing::info!("batch run skipped: {e}"),
        Err(e) => tracing::error!("batch run failed: {e}"),
    }
}
