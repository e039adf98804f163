//! End-to-end batch scoring run
//!
//! load -> prepare -> split -> fit -> score -> write, as one sequential
//! job. Any error aborts the run; nothing is written unless scoring
//! completed for the whole evaluation partition.

use churnml_model::{
    evaluate, stratified_split, EvaluationReport, ForestConfig, ModelError, RandomForest,
};
use churnml_storage::{ReplaceOutcome, StoreError, TableStore, WriteMode};
use churnml_types::{DataError, RiskTier, ScoredRecord, FEATURE_COLUMNS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::prepare::prepare;

/// Pipeline configuration.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Held-out share of rows for evaluation.
    pub test_fraction: f64,
    /// Seed for both the splitter and the forest; `forest.seed` is
    /// overridden so one value governs the whole run.
    pub seed: i64,
    pub forest: ForestConfig,
    pub write_mode: WriteMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.30,
            seed: 42,
            forest: ForestConfig::default(),
            write_mode: WriteMode::Replace,
        }
    }
}

/// Errors surfaced by a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("model serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One feature's share of the ensemble's impurity reduction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub column: String,
    pub importance: f64,
}

/// Scored rows per risk tier (thresholds 0.40 and 0.70).
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct TierCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

/// Diagnostic summary of one completed run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub rows_loaded: usize,
    pub churned: usize,
    pub retained: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub report: EvaluationReport,
    /// Sorted by importance, descending.
    pub importances: Vec<FeatureImportance>,
    pub tiers: TierCounts,
    pub stale_rows: usize,
    pub rows_written: usize,
    pub model_hash: String,
}

/// Run the full scoring job against `store`.
///
/// Returns the fitted forest (for artifact export) and the run summary.
pub fn run<S: TableStore>(
    store: &S,
    config: &PipelineConfig,
) -> Result<(RandomForest, RunSummary), PipelineError> {
    let records = store.load_customers()?;
    tracing::info!(rows = records.len(), "loaded customer snapshot");

    let (features, labels) = prepare(&records)?;
    let churned: usize = labels.iter().map(|&l| l as usize).sum();
    let retained = labels.len() - churned;
    tracing::info!(churned, retained, "churn distribution");

    let split = stratified_split(&features, &labels, config.test_fraction, config.seed)?;
    tracing::info!(
        train = split.x_train.len(),
        test = split.x_test.len(),
        "stratified split"
    );

    let forest_config = ForestConfig {
        seed: config.seed,
        ..config.forest.clone()
    };
    let forest = RandomForest::fit(&forest_config, &split.x_train, &split.y_train)?;

    let probabilities = forest.predict_proba(&split.x_test)?;
    let report = evaluate(&split.y_test, &probabilities, forest.decision_threshold());
    tracing::info!(roc_auc = report.roc_auc, accuracy = report.accuracy, "evaluation");

    let scored: Vec<ScoredRecord> = split
        .x_test
        .iter()
        .zip(probabilities.iter().zip(split.y_test.iter()))
        .map(|(row, (&probability, &label))| ScoredRecord::from_row(row, probability, label))
        .collect();

    let mut tiers = TierCounts::default();
    for record in &scored {
        match record.risk_tier() {
            RiskTier::Low => tiers.low += 1,
            RiskTier::Medium => tiers.medium += 1,
            RiskTier::High => tiers.high += 1,
        }
    }

    let ReplaceOutcome {
        stale_rows,
        rows_written,
    } = store.replace_predictions(&scored, config.write_mode)?;

    let mut importances: Vec<FeatureImportance> = FEATURE_COLUMNS
        .iter()
        .zip(forest.feature_importances().iter())
        .map(|(column, &importance)| FeatureImportance {
            column: (*column).to_string(),
            importance,
        })
        .collect();
    importances.sort_by(|a, b| {
        b.importance
            .partial_cmp(&a.importance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.column.cmp(&b.column))
    });

    let (_, model_hash) = forest.to_artifact()?;

    let summary = RunSummary {
        rows_loaded: records.len(),
        churned,
        retained,
        train_rows: split.x_train.len(),
        test_rows: split.x_test.len(),
        report,
        importances,
        tiers,
        stale_rows,
        rows_written,
        model_hash,
    };

    Ok((forest, summary))
}
