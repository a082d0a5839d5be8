//! Outlier classifier capability
//!
//! The statistical detector never talks to a model directly. It hands a
//! matrix of feature rows to an [`OutlierClassifier`] and gets one flag per
//! row back. Fitting and predicting happen in the same call, on the same
//! rows: the model only ever judges the window it was trained on.

use crate::{flag_top_fraction, ForestConfig, IsolationForest, MLError, MLResult, Sample};

/// Unsupervised outlier scorer with a single-pass fit/predict contract
pub trait OutlierClassifier {
    /// Fit on `features` and flag roughly `contamination` of them as outliers
    ///
    /// Returns one flag per input row, in input order.
    fn fit_predict(&mut self, features: &[Sample], contamination: f64) -> MLResult<Vec<bool>>;
}

/// Isolation Forest behind the classifier contract
///
/// Rows are ranked by anomaly score and at most `ceil(n × contamination)`
/// are flagged; rows tied with the highest unflagged score stay normal.
#[derive(Debug, Clone, Default)]
pub struct IsolationForestClassifier {
    config: ForestConfig,
}

impl IsolationForestClassifier {
    pub fn new(config: ForestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }
}

impl OutlierClassifier for IsolationForestClassifier {
    fn fit_predict(&mut self, features: &[Sample], contamination: f64) -> MLResult<Vec<bool>> {
        if !(contamination > 0.0 && contamination < 1.0) {
            return Err(MLError::InvalidConfig("contamination must lie in (0, 1)"));
        }

        let mut forest = IsolationForest::new(self.config.clone());
        forest.fit(features)?;

        let scores: Vec<f64> = forest.predict(features).iter().map(|s| s.score).collect();
        log::debug!(
            "isolation forest scored {} rows with {} trees",
            scores.len(),
            forest.stats().num_trees
        );

        Ok(flag_top_fraction(&scores, contamination))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_the_odd_row() {
        let mut rows: Vec<Sample> = (0..39)
            .map(|i| Sample::new(&[21.0 + (i % 5) as f64 * 0.1, 45.0 + (i % 7) as f64 * 0.2]).unwrap())
            .collect();
        rows.insert(17, Sample::new(&[34.0, 15.0]).unwrap());

        let flags = IsolationForestClassifier::default().fit_predict(&rows, 0.025).unwrap();

        assert_eq!(flags.len(), 40);
        assert_eq!(flags.iter().filter(|&&f| f).count(), 1);
        assert!(flags[17]);
    }

    #[test]
    fn contamination_validated() {
        let rows = vec![Sample::new(&[1.0]).unwrap()];
        let mut classifier = IsolationForestClassifier::default();
        assert!(classifier.fit_predict(&rows, 0.0).is_err());
        assert!(classifier.fit_predict(&rows, 1.5).is_err());
        assert_eq!(classifier.fit_predict(&[], 0.1), Err(MLError::InsufficientData));
    }
}
