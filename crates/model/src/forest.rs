//! Bagged random-forest classifier
//!
//! Trains decorrelated Gini CART trees on bootstrap samples with
//! per-split feature subsampling. All randomness flows from a single
//! injected seed, so identical data and seed reproduce identical trees.

use serde::{Deserialize, Serialize};

use crate::deterministic::LcgRng;
use crate::errors::ModelError;
use crate::tree::{Tree, TreeBuilder, TreeConfig};

/// Forest training configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ForestConfig {
    pub num_trees: usize,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Candidate features per split; `None` selects `ceil(sqrt(d))`
    pub features_per_split: Option<usize>,
    /// Probability at or above which `predict` emits class 1
    pub decision_threshold: f64,
    pub seed: i64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            num_trees: 100,
            max_depth: 12,
            min_samples_leaf: 1,
            features_per_split: None,
            decision_threshold: 0.5,
            seed: 42,
        }
    }
}

/// Model provenance recorded alongside the trees
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub version: String,
    pub created_at: i64,
    pub feature_count: usize,
    pub tree_count: usize,
    pub max_depth: usize,
    pub seed: i64,
}

/// A fitted ensemble of classification trees
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<Tree>,
    /// Normalized impurity decrease per feature; sums to 1 when any
    /// split was made
    importances: Vec<f64>,
    feature_count: usize,
    decision_threshold: f64,
    pub metadata: ModelMetadata,
}

impl RandomForest {
    /// Fit a forest on row-aligned features and binary labels.
    pub fn fit(
        config: &ForestConfig,
        features: &[Vec<f64>],
        labels: &[u8],
    ) -> Result<Self, ModelError> {
        if features.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if features.len() != labels.len() {
            return Err(ModelError::ShapeMismatch {
                features: features.len(),
                labels: labels.len(),
            });
        }

        let positives: usize = labels.iter().map(|&l| l as usize).sum();
        if positives == 0 || positives == labels.len() {
            return Err(ModelError::SingleClass);
        }

        let feature_count = features[0].len();
        let features_per_split = config
            .features_per_split
            .unwrap_or_else(|| (feature_count as f64).sqrt().ceil() as usize)
            .clamp(1, feature_count);

        let mut rng = LcgRng::new(config.seed);
        let mut trees = Vec::with_capacity(config.num_trees);
        let mut importances = vec![0.0; feature_count];

        for tree_idx in 0..config.num_trees {
            tracing::debug!("fitting tree {}/{}", tree_idx + 1, config.num_trees);

            let sample = rng.bootstrap_indices(features.len());

            let tree_config = TreeConfig {
                max_depth: config.max_depth,
                min_samples_leaf: config.min_samples_leaf,
                features_per_split,
            };

            let builder = TreeBuilder::new(features, labels, tree_config);
            let (tree, tree_importances) = builder.build(&sample, &mut rng)?;

            for (total, part) in importances.iter_mut().zip(tree_importances.iter()) {
                *total += part;
            }

            trees.push(tree);
        }

        let importance_sum: f64 = importances.iter().sum();
        if importance_sum > 0.0 {
            for value in &mut importances {
                *value /= importance_sum;
            }
        }

        let metadata = ModelMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: chrono::Utc::now().timestamp(),
            feature_count,
            tree_count: trees.len(),
            max_depth: config.max_depth,
            seed: config.seed,
        };

        Ok(Self {
            trees,
            importances,
            feature_count,
            decision_threshold: config.decision_threshold,
            metadata,
        })
    }

    /// Positive-class probability per row: mean of tree leaf estimates
    pub fn predict_proba(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        features.iter().map(|row| self.predict_proba_row(row)).collect()
    }

    /// Hard labels via the configured decision threshold
    pub fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<u8>, ModelError> {
        Ok(self
            .predict_proba(features)?
            .into_iter()
            .map(|p| u8::from(p >= self.decision_threshold))
            .collect())
    }

    fn predict_proba_row(&self, row: &[f64]) -> Result<f64, ModelError> {
        if row.len() != self.feature_count {
            return Err(ModelError::FeatureCountMismatch {
                expected: self.feature_count,
                actual: row.len(),
            });
        }

        let sum: f64 = self.trees.iter().map(|tree| tree.predict(row)).sum();
        Ok(sum / self.trees.len() as f64)
    }

    /// Normalized impurity-decrease importance, one entry per feature
    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }

    pub fn decision_threshold(&self) -> f64 {
        self.decision_threshold
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    /// Serialize the model and return `(json, blake3 hex hash)`.
    ///
    /// The hash covers trees, importances, and threshold but not the
    /// creation timestamp, so refitting with the same data and seed
    /// yields the same digest.
    pub fn to_artifact(&self) -> Result<(String, String), serde_json::Error> {
        #[derive(Serialize)]
        struct Hashed<'a> {
            trees: &'a [Tree],
            importances: &'a [f64],
            feature_count: usize,
            decision_threshold: f64,
        }

        let hashed = serde_json::to_string(&Hashed {
            trees: &self.trees,
            importances: &self.importances,
            feature_count: self.feature_count,
            decision_threshold: self.decision_threshold,
        })?;
        let digest = hex::encode(blake3::hash(hashed.as_bytes()).as_bytes());

        let json = serde_json::to_string_pretty(self)?;
        Ok((json, digest))
    }
}
