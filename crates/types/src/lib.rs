//! Shared domain types for the churn scoring pipeline.
//!
//! Rows are decoded into these statically-shaped records at the store
//! boundary; downstream code never does ad-hoc column access.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Feature columns, in the fixed order the classifier consumes them.
pub const FEATURE_COLUMNS: [&str; 4] = [
    "tenure",
    "monthly_charges",
    "total_charges",
    "senior_citizen",
];

/// Number of input features per customer.
pub const FEATURE_COUNT: usize = 4;

/// Churn category that maps to label 1.
pub const CHURN_POSITIVE: &str = "Yes";
/// Churn category that maps to label 0.
pub const CHURN_NEGATIVE: &str = "No";

/// One customer row from the source table. Read-only input, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    /// Months of service, non-negative.
    pub tenure: u32,
    pub monthly_charges: f64,
    /// May deviate from tenure * monthly_charges; treated as an independent
    /// observation, only finiteness is enforced downstream.
    pub total_charges: f64,
    pub senior_citizen: bool,
    /// Raw churn category ("Yes"/"No"); mapped to a label at prepare time.
    pub churn: String,
}

impl CustomerRecord {
    /// Numeric feature vector in `FEATURE_COLUMNS` order.
    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        [
            f64::from(self.tenure),
            self.monthly_charges,
            self.total_charges,
            if self.senior_citizen { 1.0 } else { 0.0 },
        ]
    }
}

/// One scored evaluation row, as persisted to the prediction table.
///
/// The reporting dashboard reads this exact shape; writer and reader share
/// the struct, so schema drift between them is impossible by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub tenure: f64,
    pub monthly_charges: f64,
    pub total_charges: f64,
    pub senior_citizen: f64,
    /// Predicted probability of churn, in [0, 1].
    pub predicted_churn_prob: f64,
    /// Ground-truth label: 1 = churned.
    pub actual_churn: u8,
}

impl ScoredRecord {
    pub fn from_row(features: &[f64], probability: f64, label: u8) -> Self {
        debug_assert_eq!(features.len(), FEATURE_COUNT);
        Self {
            tenure: features[0],
            monthly_charges: features[1],
            total_charges: features[2],
            senior_citizen: features[3],
            predicted_churn_prob: probability,
            actual_churn: label,
        }
    }

    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        [
            self.tenure,
            self.monthly_charges,
            self.total_charges,
            self.senior_citizen,
        ]
    }

    pub fn risk_tier(&self) -> RiskTier {
        RiskTier::from_probability(self.predicted_churn_prob)
    }
}

/// Bucketed churn-probability range used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// Lower bound of the medium tier.
    pub const MEDIUM_THRESHOLD: f64 = 0.40;
    /// Lower bound of the high tier.
    pub const HIGH_THRESHOLD: f64 = 0.70;

    pub fn from_probability(probability: f64) -> Self {
        if probability >= Self::HIGH_THRESHOLD {
            Self::High
        } else if probability >= Self::MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Explicit store configuration passed into loader/writer constructors.
/// There is no process-wide connection singleton.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the sled database directory.
    pub path: PathBuf,
    /// Source table holding raw customer rows.
    pub customer_table: String,
    /// Destination table fully replaced on each run.
    pub predictions_table: String,
}

impl StoreConfig {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            customer_table: "customer_data".to_string(),
            predictions_table: "churn_predictions".to_string(),
        }
    }
}

/// Data-quality errors raised while ingesting or preparing customer rows.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("source dataset is empty")]
    Empty,

    #[error("required column `{0}` is missing from the source")]
    MissingColumn(String),

    #[error("row {row}: column `{column}` has invalid value `{value}`")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row}: unrecognized churn category `{value}` (expected `Yes` or `No`)")]
    UnknownChurnValue { row: usize, value: String },

    #[error("row {row}: feature `{column}` is not finite")]
    NonFiniteFeature { row: usize, column: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_order() {
        let record = CustomerRecord {
            tenure: 12,
            monthly_charges: 70.5,
            total_charges: 846.0,
            senior_citizen: true,
            churn: "No".to_string(),
        };

        assert_eq!(record.features(), [12.0, 70.5, 846.0, 1.0]);
    }

    #[test]
    fn test_risk_tier_boundaries() {
        assert_eq!(RiskTier::from_probability(0.0), RiskTier::Low);
        assert_eq!(RiskTier::from_probability(0.39), RiskTier::Low);
        assert_eq!(RiskTier::from_probability(0.40), RiskTier::Medium);
        assert_eq!(RiskTier::from_probability(0.69), RiskTier::Medium);
        assert_eq!(RiskTier::from_probability(0.70), RiskTier::High);
        assert_eq!(RiskTier::from_probability(1.0), RiskTier::High);
    }

    #[test]
    fn test_scored_record_round_trip() {
        let record = ScoredRecord::from_row(&[24.0, 55.25, 1326.0, 0.0], 0.82, 1);

        let json = serde_json::to_vec(&record).unwrap();
        let decoded: ScoredRecord = serde_json::from_slice(&json).unwrap();

        assert_eq!(decoded, record);
        assert_eq!(decoded.risk_tier(), RiskTier::High);
    }

    #[test]
    fn test_store_config_defaults() {
        let config = StoreConfig::new("/tmp/churn-db");
        assert_eq!(config.customer_table, "customer_data");
        assert_eq!(config.predictions_table, "churn_predictions");
    }
}
