//! Batch Outlier Detection for Environmental Readings
//!
//! ## Overview
//!
//! Edge mode catches readings outside fixed bounds. Batch mode looks for
//! something subtler: combinations of temperature and humidity that are
//! unusual for *this* room over the last day, even when each value on its own
//! is within bounds (warm and bone dry at 3am, say).
//!
//! ```text
//! readings ──► pivot ──► [temp, hum] rows ──► fit_predict ──► outlier flags
//!                │                               (Isolation Forest)
//!                └──► rows missing a kind: not evaluable
//! ```
//!
//! ## Why Isolation Forest?
//!
//! 1. **Unsupervised**: no labelled history of "bad days" exists
//! 2. **Multivariate**: scores the joint temperature/humidity point
//! 3. **Cheap**: a day of minute-level readings fits in one pass
//! 4. **Deterministic**: a fixed seed flags the same rows on every rerun
//!
//! The model is fit fresh on every batch window and thrown away afterwards.
//! Nothing is learned across runs.
//!
//! ### How Isolation Forest Works
//!
//! ```text
//! Normal points: need many random partitions to isolate
//! Anomalies:     isolated after a few partitions
//!
//! Anomaly Score = 2^(-E[path_length] / c(n))
//! ```
//!
//! ## Substituting the Model
//!
//! The detector only depends on [`OutlierClassifier`]. Any scorer with a
//! `fit_predict` contract works; tests plug in a fixed-answer classifier to
//! exercise pivoting without the forest.
//!
//! ## Example
//!
//! ```rust
//! use envguard_ml::{DetectorConfig, IsolationForestClassifier, StatisticalDetector};
//!
//! let mut detector = StatisticalDetector::new(
//!     IsolationForestClassifier::default(),
//!     DetectorConfig::default(),
//! )?;
//! let readings: Vec<envguard_core::Reading> = Vec::new();
//! assert!(detector.detect(&readings).is_err()); // empty window
//! # Ok::<(), envguard_ml::DetectorError>(())
//! ```

use thiserror::Error;

pub mod classifier;
pub mod detector;
pub mod forest;
pub mod node;
pub mod scoring;
pub mod tree;

pub use classifier::{IsolationForestClassifier, OutlierClassifier};
pub use detector::{Detection, DetectorConfig, DetectorError, RowOutcome, StatisticalDetector};
pub use forest::{ForestConfig, ForestStats, IsolationForest};
pub use node::{c_factor, Node, NodeType};
pub use scoring::{calculate_anomaly_score, flag_top_fraction, AnomalyScore};
pub use tree::{IsolationTree, TreeConfig};

/// Default number of samples drawn to build each tree
pub const DEFAULT_SAMPLE_SIZE: usize = 256;

/// Default number of trees in the forest
pub const DEFAULT_NUM_TREES: usize = 100;

/// Result type for model operations
pub type MLResult<T> = Result<T, MLError>;

/// Model errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MLError {
    /// Nothing to fit on
    #[error("insufficient data to fit the model")]
    InsufficientData,

    /// A sample lacked a feature the model expects
    #[error("sample has an invalid or missing feature")]
    InvalidFeature,

    /// Model parameters make no sense
    #[error("invalid model configuration: {0}")]
    InvalidConfig(&'static str),
}

/// One row of features for the model
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub features: Vec<f64>,
}

impl Sample {
    /// Create a sample; fails on empty or non-finite features
    pub fn new(features: &[f64]) -> MLResult<Self> {
        if features.is_empty() || features.iter().any(|f| !f.is_finite()) {
            return Err(MLError::InvalidFeature);
        }
        Ok(Self { features: features.to_vec() })
    }

    pub fn num_features(&self) -> usize {
        self.features.len()
    }

    pub fn get_feature(&self, index: usize) -> Option<f64> {
        self.features.get(index).copied()
    }
}

/// Small seeded generator (xorshift64*)
///
/// Keeps model output reproducible without pulling a RNG crate into the
/// runtime dependency tree.
#[derive(Debug, Clone)]
pub struct Rng {
    state: u64,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        // Zero is a fixed point of xorshift
        let state = seed ^ 0x9E37_79B9_7F4A_7C15;
        Self { state: if state == 0 { 0x2545_F491_4F6C_DD1D } else { state } }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// Uniform in `0..n`; returns 0 for `n == 0`
    pub fn next_range(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        (self.next_u64() % n as u64) as usize
    }

    /// Uniform in `[0, 1)`
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform in `[min, max)`
    pub fn next_f64_range(&mut self, min: f64, max: f64) -> f64 {
        min + (max - min) * self.next_f64()
    }
}

/// Average path length of an unsuccessful BST search over `n` points
///
/// Normalizes isolation depths; equal to [`c_factor`].
pub fn average_path_length(n: usize) -> f64 {
    c_factor(n)
}
