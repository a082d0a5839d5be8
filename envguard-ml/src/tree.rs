//! Isolation tree implementation
//!
//! A tree is built by recursively splitting its sample on a random feature at
//! a random value between that feature's min and max, until each sample is
//! alone, all remaining samples are identical, or the depth limit is hit.

use crate::{MLError, MLResult, Node, NodeType, Rng, Sample};

/// Configuration for isolation tree
#[derive(Debug, Clone, Copy)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub seed: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self { max_depth: 8, seed: 42 }
    }
}

/// Isolation tree stored as a flat node array, root at index 0
#[derive(Debug, Clone)]
pub struct IsolationTree {
    pub nodes: Vec<Node>,
    pub config: TreeConfig,
    rng: Rng,
}

impl IsolationTree {
    pub fn new(config: TreeConfig) -> Self {
        Self { nodes: Vec::new(), config, rng: Rng::new(config.seed) }
    }

    /// Train the tree on samples, replacing any previous structure
    pub fn fit(&mut self, samples: &[Sample]) -> MLResult<()> {
        if samples.is_empty() {
            return Err(MLError::InsufficientData);
        }

        self.nodes.clear();
        let refs: Vec<&Sample> = samples.iter().collect();
        self.build_tree(&refs, 0)?;

        Ok(())
    }

    fn build_tree(&mut self, samples: &[&Sample], depth: usize) -> MLResult<usize> {
        let node_index = self.nodes.len();

        if depth >= self.config.max_depth || samples.len() <= 1 {
            self.nodes.push(Node::external(samples.len(), depth));
            return Ok(node_index);
        }

        let Some((feature, split_value)) = self.select_split(samples)? else {
            // Every feature is constant: the samples cannot be separated
            self.nodes.push(Node::external(samples.len(), depth));
            return Ok(node_index);
        };

        let (left_samples, right_samples): (Vec<&Sample>, Vec<&Sample>) = samples
            .iter()
            .copied()
            .partition(|sample| sample.features[feature] < split_value);

        if left_samples.is_empty() || right_samples.is_empty() {
            self.nodes.push(Node::external(samples.len(), depth));
            return Ok(node_index);
        }

        // Reserve the slot, then patch it once the children exist
        self.nodes.push(Node::external(0, depth));
        let left = self.build_tree(&left_samples, depth + 1)?;
        let right = self.build_tree(&right_samples, depth + 1)?;
        self.nodes[node_index] = Node::internal(feature, split_value, left, right, depth);

        Ok(node_index)
    }

    /// Pick a random feature with spread and a split value inside its range
    fn select_split(&mut self, samples: &[&Sample]) -> MLResult<Option<(usize, f64)>> {
        let num_features = samples[0].num_features();
        if num_features == 0 || samples.iter().any(|s| s.num_features() != num_features) {
            return Err(MLError::InvalidFeature);
        }

        // Start at a random feature and scan, so constant features are skipped
        let offset = self.rng.next_range(num_features);
        for step in 0..num_features {
            let feature = (offset + step) % num_features;
            let (min_val, max_val) = feature_range(samples, feature);
            if max_val > min_val {
                let mut split_value = self.rng.next_f64_range(min_val, max_val);
                if split_value <= min_val {
                    // Guarantees a non-empty left side
                    split_value = min_val + (max_val - min_val) / 2.0;
                }
                return Ok(Some((feature, split_value)));
            }
        }

        Ok(None)
    }

    /// Depth at which `sample` is isolated, plus the leaf adjustment
    pub fn path_length(&self, sample: &Sample) -> f64 {
        let mut current = 0;

        while let Some(node) = self.nodes.get(current) {
            match node.node_type {
                NodeType::External { .. } => return node.path_length(),
                NodeType::Internal { .. } => match node.traverse(sample) {
                    Ok(next) => current = next,
                    Err(_) => return node.depth as f64,
                },
            }
        }

        0.0
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }
}

fn feature_range(samples: &[&Sample], feature: usize) -> (f64, f64) {
    samples.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), sample| {
        let value = sample.features[feature];
        (min.min(value), max.max(value))
    })
}
