//! Feature preparation
//!
//! Derives the fixed four-column feature matrix and the binary label
//! vector from raw customer records. The churn field goes through a
//! two-entry lookup; anything else is a data-quality error. Non-finite
//! numerics are rejected rather than imputed or propagated.

use churnml_types::{CustomerRecord, DataError, CHURN_NEGATIVE, CHURN_POSITIVE, FEATURE_COLUMNS};

/// Row-aligned feature matrix and labels derived from `records`.
///
/// Output row count always equals input row count; labels are 0/1 only.
pub fn prepare(records: &[CustomerRecord]) -> Result<(Vec<Vec<f64>>, Vec<u8>), DataError> {
    if records.is_empty() {
        return Err(DataError::Empty);
    }

    let mut features = Vec::with_capacity(records.len());
    let mut labels = Vec::with_capacity(records.len());

    for (row, record) in records.iter().enumerate() {
        let values = record.features();
        for (&column, &value) in FEATURE_COLUMNS.iter().zip(values.iter()) {
            if !value.is_finite() {
                return Err(DataError::NonFiniteFeature { row, column });
            }
        }

        let label = match record.churn.trim() {
            CHURN_NEGATIVE => 0u8,
            CHURN_POSITIVE => 1u8,
            other => {
                return Err(DataError::UnknownChurnValue {
                    row,
                    value: other.to_string(),
                })
            }
        };

        features.push(values.to_vec());
        labels.push(label);
    }

    Ok((features, labels))
}
