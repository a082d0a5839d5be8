//! Isolation Forest implementation
//!
//! Combines many isolation trees, each built on a random sub-sample, and
//! averages their path lengths into one anomaly score per sample.

use crate::{
    calculate_anomaly_score, AnomalyScore, IsolationTree, MLError, MLResult, Rng, Sample,
    TreeConfig, DEFAULT_NUM_TREES, DEFAULT_SAMPLE_SIZE,
};

/// Configuration for Isolation Forest
#[derive(Debug, Clone, PartialEq)]
pub struct ForestConfig {
    /// Number of trees in the forest
    pub num_trees: usize,
    /// Sub-sample size for each tree (capped at the data size)
    pub sample_size: usize,
    /// Maximum tree depth; `None` uses `ceil(log2(sample_size))`
    pub max_depth: Option<usize>,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            num_trees: DEFAULT_NUM_TREES,
            sample_size: DEFAULT_SAMPLE_SIZE,
            max_depth: None,
            seed: 42,
        }
    }
}

impl ForestConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Isolation Forest for anomaly detection
#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    config: ForestConfig,
    rng: Rng,
    /// Sub-sample size the trees were actually built with
    fitted_sample_size: usize,
}

impl IsolationForest {
    pub fn new(config: ForestConfig) -> Self {
        let seed = config.seed;
        Self { trees: Vec::new(), config, rng: Rng::new(seed), fitted_sample_size: 0 }
    }

    /// Train the forest on samples
    ///
    /// Refitting resets the generator, so the same data and seed always give
    /// the same forest.
    pub fn fit(&mut self, samples: &[Sample]) -> MLResult<()> {
        if samples.is_empty() {
            return Err(MLError::InsufficientData);
        }
        if self.config.num_trees == 0 || self.config.sample_size == 0 {
            return Err(MLError::InvalidConfig("num_trees and sample_size must be positive"));
        }

        self.rng = Rng::new(self.config.seed);
        self.trees.clear();

        let sample_size = self.config.sample_size.min(samples.len());
        let max_depth = self
            .config
            .max_depth
            .unwrap_or_else(|| (sample_size.max(2) as f64).log2().ceil() as usize);

        for i in 0..self.config.num_trees {
            let tree_config = TreeConfig {
                max_depth,
                seed: self.config.seed.wrapping_add(i as u64 + 1),
            };
            let subset = self.sample_subset(samples, sample_size);

            let mut tree = IsolationTree::new(tree_config);
            tree.fit(&subset)?;
            self.trees.push(tree);
        }

        self.fitted_sample_size = sample_size;
        Ok(())
    }

    /// Random sampling without replacement (partial Fisher-Yates shuffle)
    fn sample_subset(&mut self, samples: &[Sample], sample_size: usize) -> Vec<Sample> {
        if sample_size >= samples.len() {
            return samples.to_vec();
        }

        let mut indices: Vec<usize> = (0..samples.len()).collect();
        for i in 0..sample_size {
            let j = i + self.rng.next_range(samples.len() - i);
            indices.swap(i, j);
        }

        indices[..sample_size].iter().map(|&i| samples[i].clone()).collect()
    }

    /// Calculate anomaly score for a sample
    pub fn anomaly_score(&self, sample: &Sample) -> AnomalyScore {
        if self.trees.is_empty() {
            return AnomalyScore::new(0.5, 0.0, 0);
        }

        let total_path_length: f64 = self.trees.iter().map(|tree| tree.path_length(sample)).sum();
        let avg_path_length = total_path_length / self.trees.len() as f64;
        let score = calculate_anomaly_score(avg_path_length, self.fitted_sample_size);

        AnomalyScore::new(score, avg_path_length, self.trees.len())
    }

    /// Score many samples
    pub fn predict(&self, samples: &[Sample]) -> Vec<AnomalyScore> {
        samples.iter().map(|sample| self.anomaly_score(sample)).collect()
    }

    pub fn stats(&self) -> ForestStats {
        ForestStats {
            num_trees: self.trees.len(),
            total_nodes: self.trees.iter().map(|t| t.node_count()).sum(),
            max_depth: self.trees.iter().map(|t| t.depth()).max().unwrap_or(0),
            sample_size: self.fitted_sample_size,
        }
    }
}

/// Forest statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForestStats {
    pub num_trees: usize,
    pub total_nodes: usize,
    pub max_depth: usize,
    pub sample_size: usize,
}
