//! Stratified train/test partitioning
//!
//! Shuffles each class's row indices with the seeded RNG and holds out a
//! rounded per-class share, so every split preserves the class balance of
//! the full set and the same seed reproduces the same partition.

use crate::deterministic::LcgRng;
use crate::errors::ModelError;

/// A train/test partition of row-aligned features and labels
#[derive(Clone, Debug)]
pub struct SplitSets {
    pub x_train: Vec<Vec<f64>>,
    pub y_train: Vec<u8>,
    pub x_test: Vec<Vec<f64>>,
    pub y_test: Vec<u8>,
}

/// Partition `features`/`labels` with stratification on the binary label.
///
/// The held-out count per class is `round(test_fraction * class_count)`;
/// both partitions keep the original row order. No row lands in both.
pub fn stratified_split(
    features: &[Vec<f64>],
    labels: &[u8],
    test_fraction: f64,
    seed: i64,
) -> Result<SplitSets, ModelError> {
    if features.is_empty() {
        return Err(ModelError::EmptyTrainingSet);
    }
    if features.len() != labels.len() {
        return Err(ModelError::ShapeMismatch {
            features: features.len(),
            labels: labels.len(),
        });
    }
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(ModelError::InvalidFraction(test_fraction));
    }

    let mut rng = LcgRng::new(seed);
    let mut in_test = vec![false; labels.len()];

    for class in [0u8, 1u8] {
        let mut class_indices: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, &label)| label == class)
            .map(|(i, _)| i)
            .collect();

        rng.shuffle(&mut class_indices);

        let held_out = (test_fraction * class_indices.len() as f64).round() as usize;
        for &idx in class_indices.iter().take(held_out) {
            in_test[idx] = true;
        }
    }

    let mut split = SplitSets {
        x_train: Vec::new(),
        y_train: Vec::new(),
        x_test: Vec::new(),
        y_test: Vec::new(),
    };

    for (idx, row) in features.iter().enumerate() {
        if in_test[idx] {
            split.x_test.push(row.clone());
            split.y_test.push(labels[idx]);
        } else {
            split.x_train.push(row.clone());
            split.y_train.push(labels[idx]);
        }
    }

    Ok(split)
}
