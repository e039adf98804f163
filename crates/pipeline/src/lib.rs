//! Batch churn scoring pipeline
//!
//! Loads raw customer rows from the table store, derives features and
//! labels, fits a deterministic random forest on a stratified training
//! split, scores the held-out partition, and replaces the prediction
//! table. The reporting dashboard is a separate read-only consumer.

pub mod ingest;
pub mod prepare;
pub mod run;

pub use ingest::read_customers_csv;
pub use prepare::prepare;
pub use run::{run, FeatureImportance, PipelineConfig, PipelineError, RunSummary, TierCounts};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
