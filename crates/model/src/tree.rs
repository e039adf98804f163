//! CART (Classification and Regression Tree) builder
//!
//! Builds a single Gini-impurity classification tree over a bootstrap
//! sample, with randomized feature subsampling per split and
//! deterministic tie-breaking.

use serde::{Deserialize, Serialize};

use crate::deterministic::LcgRng;
use crate::errors::ModelError;

/// Training parameters for a single tree
#[derive(Clone, Debug)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Candidate features drawn per split
    pub features_per_split: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 12,
            min_samples_leaf: 1,
            features_per_split: 2,
        }
    }
}

/// One tree node; leaves carry the positive-class fraction of their samples
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub feature_index: u16,
    pub threshold: f64,
    pub left: u16,
    pub right: u16,
    pub value: Option<f64>,
}

/// A fitted decision tree stored as a flat node array
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Positive-class probability estimate for one feature vector
    pub fn predict(&self, features: &[f64]) -> f64 {
        let mut idx = 0usize;

        loop {
            if idx >= self.nodes.len() {
                return 0.0;
            }

            let node = &self.nodes[idx];

            if let Some(value) = node.value {
                return value;
            }

            let feature_idx = node.feature_index as usize;
            if feature_idx >= features.len() {
                return 0.0;
            }

            idx = if features[feature_idx] <= node.threshold {
                node.left as usize
            } else {
                node.right as usize
            };
        }
    }
}

/// Split candidate: impurity decrease plus a deterministic tie-break key
#[derive(Debug, Clone)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    decrease: f64,
}

impl SplitCandidate {
    /// Strict ordering: larger decrease wins, ties broken on the smaller
    /// (feature_idx, threshold) pair so split choice never depends on
    /// iteration order.
    fn beats(&self, other: &SplitCandidate) -> bool {
        if self.decrease != other.decrease {
            return self.decrease > other.decrease;
        }
        if self.feature_idx != other.feature_idx {
            return self.feature_idx < other.feature_idx;
        }
        self.threshold < other.threshold
    }
}

/// Gini impurity of a binary class distribution
fn gini(positives: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = positives as f64 / total as f64;
    2.0 * p * (1.0 - p)
}

/// Build a classification tree over a sample of the training set
pub struct TreeBuilder<'a> {
    config: TreeConfig,
    features: &'a [Vec<f64>],
    labels: &'a [u8],
    feature_count: usize,
    /// Total samples handed to `build`; weights importance contributions
    total_samples: usize,
    /// Unnormalized impurity decrease accumulated per feature
    importances: Vec<f64>,
    /// Node indices are u16; growing past this is an error, not a wrap
    node_limit: usize,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(features: &'a [Vec<f64>], labels: &'a [u8], config: TreeConfig) -> Self {
        assert_eq!(features.len(), labels.len());

        let feature_count = if features.is_empty() {
            0
        } else {
            features[0].len()
        };

        Self {
            config,
            features,
            labels,
            feature_count,
            total_samples: 0,
            importances: vec![0.0; feature_count],
            node_limit: u16::MAX as usize,
        }
    }

    #[cfg(test)]
    fn with_node_limit(mut self, limit: usize) -> Self {
        self.node_limit = limit.min(u16::MAX as usize);
        self
    }

    /// Build a tree over `indices` (a bootstrap sample, with repeats)
    pub fn build(
        mut self,
        indices: &[usize],
        rng: &mut LcgRng,
    ) -> Result<(Tree, Vec<f64>), ModelError> {
        self.total_samples = indices.len();

        let mut nodes = Vec::new();
        self.build_node(indices, 0, &mut nodes, rng)?;

        Ok((Tree { nodes }, self.importances))
    }

    fn build_node(
        &mut self,
        indices: &[usize],
        depth: usize,
        nodes: &mut Vec<Node>,
        rng: &mut LcgRng,
    ) -> Result<u16, ModelError> {
        let current_idx = self.reserve_index(nodes)?;
        let leaf_value = self.positive_fraction(indices);

        // Stopping conditions
        if depth >= self.config.max_depth
            || indices.len() < 2 * self.config.min_samples_leaf
        {
            nodes.push(Self::leaf(leaf_value));
            return Ok(current_idx);
        }

        let split = match self.find_best_split(indices, rng) {
            Some(s) => s,
            None => {
                // Pure node or no admissible split
                nodes.push(Self::leaf(leaf_value));
                return Ok(current_idx);
            }
        };

        let (left_indices, right_indices) =
            self.split_samples(indices, split.feature_idx, split.threshold);

        if left_indices.len() < self.config.min_samples_leaf
            || right_indices.len() < self.config.min_samples_leaf
        {
            nodes.push(Self::leaf(leaf_value));
            return Ok(current_idx);
        }

        // Weighted impurity decrease credited to the split feature
        self.importances[split.feature_idx] +=
            indices.len() as f64 / self.total_samples as f64 * split.decrease;

        // Reserve the interior node, then fill child links
        nodes.push(Node {
            feature_index: split.feature_idx as u16,
            threshold: split.threshold,
            left: 0,
            right: 0,
            value: None,
        });

        let left_idx = self.build_node(&left_indices, depth + 1, nodes, rng)?;
        let right_idx = self.build_node(&right_indices, depth + 1, nodes, rng)?;

        nodes[current_idx as usize].left = left_idx;
        nodes[current_idx as usize].right = right_idx;

        Ok(current_idx)
    }

    /// Next node index, checked against the u16 addressing limit
    fn reserve_index(&self, nodes: &[Node]) -> Result<u16, ModelError> {
        if nodes.len() >= self.node_limit {
            return Err(ModelError::TreeTooLarge {
                limit: self.node_limit,
            });
        }
        Ok(nodes.len() as u16)
    }

    fn leaf(value: f64) -> Node {
        Node {
            feature_index: 0,
            threshold: 0.0,
            left: 0,
            right: 0,
            value: Some(value),
        }
    }

    /// Scan candidate features with a sorted sweep and keep the best split
    fn find_best_split(&self, indices: &[usize], rng: &mut LcgRng) -> Option<SplitCandidate> {
        let n = indices.len();
        let positives = self.count_positives(indices);
        let parent_impurity = gini(positives, n);

        if parent_impurity == 0.0 {
            return None;
        }

        let candidates = rng.sample_distinct(self.feature_count, self.config.features_per_split);
        let mut best: Option<SplitCandidate> = None;

        for feature_idx in candidates {
            let mut pairs: Vec<(f64, u8)> = indices
                .iter()
                .map(|&i| (self.features[i][feature_idx], self.labels[i]))
                .collect();
            // Feature values are validated finite upstream, so total order holds
            pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

            let mut left_n = 0usize;
            let mut left_pos = 0usize;

            for k in 0..n - 1 {
                left_n += 1;
                left_pos += pairs[k].1 as usize;

                // Only cut between distinct values
                if pairs[k].0 >= pairs[k + 1].0 {
                    continue;
                }

                let right_n = n - left_n;
                if left_n < self.config.min_samples_leaf || right_n < self.config.min_samples_leaf {
                    continue;
                }

                let right_pos = positives - left_pos;
                let weighted = left_n as f64 / n as f64 * gini(left_pos, left_n)
                    + right_n as f64 / n as f64 * gini(right_pos, right_n);
                let decrease = parent_impurity - weighted;

                if decrease <= 0.0 {
                    continue;
                }

                let candidate = SplitCandidate {
                    feature_idx,
                    threshold: (pairs[k].0 + pairs[k + 1].0) / 2.0,
                    decrease,
                };

                best = match best {
                    None => Some(candidate),
                    Some(current) => {
                        if candidate.beats(&current) {
                            Some(candidate)
                        } else {
                            Some(current)
                        }
                    }
                };
            }
        }

        best
    }

    fn split_samples(
        &self,
        indices: &[usize],
        feature_idx: usize,
        threshold: f64,
    ) -> (Vec<usize>, Vec<usize>) {
        let mut left = Vec::new();
        let mut right = Vec::new();

        for &idx in indices {
            if self.features[idx][feature_idx] <= threshold {
                left.push(idx);
            } else {
                right.push(idx);
            }
        }

        (left, right)
    }

    fn count_positives(&self, indices: &[usize]) -> usize {
        indices.iter().map(|&i| self.labels[i] as usize).sum()
    }

    fn positive_fraction(&self, indices: &[usize]) -> f64 {
        if indices.is_empty() {
            return 0.0;
        }
        self.count_positives(indices) as f64 / indices.len() as f64
    }
}
