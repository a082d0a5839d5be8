//! Isolation tree node implementation
//!
//! Trees are stored as flat arrays; children are referenced by index so a
//! fitted tree is a single allocation.

use crate::{MLError, MLResult, Sample};

/// Node type in the isolation tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeType {
    /// Internal node with split condition
    Internal {
        /// Feature index to split on
        feature: usize,
        /// Values below go left, the rest go right
        split_value: f64,
        left: usize,
        right: usize,
    },
    /// Leaf node (external)
    External {
        /// Number of training samples that reached this leaf
        size: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub node_type: NodeType,
    /// Path length from root
    pub depth: usize,
}

impl Node {
    pub fn internal(feature: usize, split_value: f64, left: usize, right: usize, depth: usize) -> Self {
        Self {
            node_type: NodeType::Internal { feature, split_value, left, right },
            depth,
        }
    }

    pub fn external(size: usize, depth: usize) -> Self {
        Self { node_type: NodeType::External { size }, depth }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.node_type, NodeType::External { .. })
    }

    /// Path length credited to a sample ending at this node
    ///
    /// Leaves holding several samples add the expected depth of the subtree
    /// that was never built.
    pub fn path_length(&self) -> f64 {
        match self.node_type {
            NodeType::External { size } => self.depth as f64 + c_factor(size),
            NodeType::Internal { .. } => self.depth as f64,
        }
    }

    /// Child index to visit next for `sample`
    pub fn traverse(&self, sample: &Sample) -> MLResult<usize> {
        match self.node_type {
            NodeType::Internal { feature, split_value, left, right } => {
                let value = sample.get_feature(feature).ok_or(MLError::InvalidFeature)?;
                Ok(if value < split_value { left } else { right })
            }
            NodeType::External { .. } => {
                Err(MLError::InvalidConfig("cannot traverse from a leaf node"))
            }
        }
    }
}

/// Calculate c(n), the average path length of an unsuccessful BST search
///
/// `c(n) = 2 H(n-1) - 2 (n-1) / n`, with `H(i) ≈ ln(i) + γ`.
pub fn c_factor(n: usize) -> f64 {
    const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}
