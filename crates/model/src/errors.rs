use thiserror::Error;

/// Errors returned by the classifier and splitter.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("feature matrix has {features} rows but label vector has {labels}")]
    ShapeMismatch { features: usize, labels: usize },

    #[error("training labels contain a single class; a classifier needs both")]
    SingleClass,

    #[error("held-out fraction {0} is outside (0, 1)")]
    InvalidFraction(f64),

    #[error("row has {actual} features, model was fitted on {expected}")]
    FeatureCountMismatch { expected: usize, actual: usize },

    #[error("tree grew past {limit} nodes; lower max_depth or raise min_samples_leaf")]
    TreeTooLarge { limit: usize },
}
