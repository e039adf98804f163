//! Deterministic random-forest churn classifier
//!
//! Provides the seeded RNG, stratified splitter, bagged CART ensemble,
//! and evaluation metrics used by the scoring pipeline. Reproducibility
//! is a contract: identical data and seed produce identical models.

pub mod deterministic;
pub mod errors;
pub mod forest;
pub mod metrics;
pub mod split;
pub mod tree;

pub use deterministic::LcgRng;
pub use errors::ModelError;
pub use forest::{ForestConfig, ModelMetadata, RandomForest};
pub use metrics::{evaluate, roc_auc, ClassReport, EvaluationReport};
pub use split::{stratified_split, SplitSets};
pub use tree::{Tree, TreeConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
