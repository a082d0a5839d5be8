//! Anomaly scoring and contamination thresholding
//!
//! Scores live in `(0, 1]`: around 0.5 for ordinary points, approaching 1 for
//! points isolated near the root. Turning scores into flags uses the
//! contamination rate rather than a fixed cut-off, so each window flags
//! roughly the same share of rows no matter how noisy the day was.

use crate::average_path_length;

/// Anomaly score result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyScore {
    /// Raw anomaly score (0.5 = ordinary, 1.0 = isolated immediately)
    pub score: f64,
    /// Average path length across trees
    pub avg_path_length: f64,
    /// Number of trees used
    pub num_trees: usize,
}

impl AnomalyScore {
    pub fn new(score: f64, avg_path_length: f64, num_trees: usize) -> Self {
        Self { score, avg_path_length, num_trees }
    }

    /// Check if score exceeds a fixed threshold
    pub fn is_anomaly(&self, threshold: f64) -> bool {
        self.score > threshold
    }
}

/// Calculate anomaly score from path lengths
///
/// Uses the formula: score = 2^(-E(h(x))/c(n))
/// where E(h(x)) is expected path length and c(n) is average path length
pub fn calculate_anomaly_score(avg_path_length: f64, num_samples: usize) -> f64 {
    if num_samples <= 1 {
        return 0.5;
    }

    let expected_path = average_path_length(num_samples);
    if expected_path == 0.0 {
        return 0.5;
    }

    2.0_f64.powf(-avg_path_length / expected_path)
}

/// Flag at most `ceil(len × contamination)` of the highest scores
///
/// The cut sits at the highest score left unflagged; only scores strictly
/// above it are outliers. Rows tied with the cut stay normal, so a window
/// with no spread flags nothing. A contamination outside `(0, 1)` flags
/// nothing either.
pub fn flag_top_fraction(scores: &[f64], contamination: f64) -> Vec<bool> {
    if scores.is_empty() || !(contamination > 0.0 && contamination < 1.0) {
        return vec![false; scores.len()];
    }

    let count = ((scores.len() as f64) * contamination).ceil() as usize;

    let mut ranked = scores.to_vec();
    ranked.sort_by(|a, b| b.total_cmp(a));
    let cut = ranked[count.min(ranked.len() - 1)];

    scores.iter().map(|&score| score > cut).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anomaly_score() {
        let score = AnomalyScore::new(0.7, 3.5, 100);
        assert!(score.is_anomaly(0.6));
        assert!(!score.is_anomaly(0.8));
    }

    #[test]
    fn test_calculate_anomaly_score() {
        // Short path = anomaly (high score)
        let score1 = calculate_anomaly_score(2.0, 100);
        assert!(score1 > 0.6);

        // Expected path length scores 0.5
        let expected = average_path_length(100);
        let score2 = calculate_anomaly_score(expected, 100);
        assert!((score2 - 0.5).abs() < 1e-9);

        // Longer than expected = more normal
        let score3 = calculate_anomaly_score(expected * 1.2, 100);
        assert!(score3 < 0.5);

        // Edge cases
        assert_eq!(calculate_anomaly_score(0.0, 0), 0.5);
        assert_eq!(calculate_anomaly_score(0.0, 1), 0.5);
    }

    #[test]
    fn flags_highest_scores() {
        let scores = [0.40, 0.80, 0.45, 0.72, 0.50];
        let flags = flag_top_fraction(&scores, 0.4);
        assert_eq!(flags, vec![false, true, false, true, false]);
    }

    #[test]
    fn small_windows_flag_at_least_one() {
        let scores = [0.5, 0.6, 0.55];
        assert_eq!(flag_top_fraction(&scores, 0.05), vec![false, true, false]);
    }

    #[test]
    fn flat_scores_flag_nothing() {
        let scores = [0.7; 1440];
        assert!(flag_top_fraction(&scores, 0.05).iter().all(|&f| !f));
    }

    #[test]
    fn ties_at_the_cut_stay_normal() {
        let scores = [0.9, 0.7, 0.7, 0.2];
        assert_eq!(flag_top_fraction(&scores, 0.5), vec![true, false, false, false]);
    }

    #[test]
    fn whole_window_quota_keeps_the_lowest_normal() {
        let scores = [0.6, 0.5];
        assert_eq!(flag_top_fraction(&scores, 0.9), vec![true, false]);
    }

    #[test]
    fn invalid_contamination_flags_nothing() {
        let scores = [0.9, 0.1];
        assert_eq!(flag_top_fraction(&scores, 0.0), vec![false, false]);
        assert_eq!(flag_top_fraction(&scores, 1.0), vec![false, false]);
        assert!(flag_top_fraction(&[], 0.1).is_empty());
    }
}
