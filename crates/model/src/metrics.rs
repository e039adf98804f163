//! Evaluation metrics for the scored partition
//!
//! ROC AUC, confusion matrix, and per-class precision/recall/F1 for the
//! diagnostic report logged after each run.

use serde::{Deserialize, Serialize};

/// Per-class precision/recall/F1 with support counts
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClassReport {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Evaluation summary over one test partition
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub roc_auc: f64,
    /// `confusion[actual][predicted]`
    pub confusion: [[usize; 2]; 2],
    pub accuracy: f64,
    pub negative: ClassReport,
    pub positive: ClassReport,
}

/// Compute the evaluation report for true labels, probabilities, and the
/// decision threshold used for hard predictions.
pub fn evaluate(labels: &[u8], probabilities: &[f64], threshold: f64) -> EvaluationReport {
    debug_assert_eq!(labels.len(), probabilities.len());

    let mut confusion = [[0usize; 2]; 2];
    for (&label, &prob) in labels.iter().zip(probabilities.iter()) {
        let predicted = usize::from(prob >= threshold);
        confusion[label as usize][predicted] += 1;
    }

    let total = labels.len();
    let correct = confusion[0][0] + confusion[1][1];
    let accuracy = if total > 0 {
        correct as f64 / total as f64
    } else {
        0.0
    };

    EvaluationReport {
        roc_auc: roc_auc(labels, probabilities),
        confusion,
        accuracy,
        negative: class_report(&confusion, 0),
        positive: class_report(&confusion, 1),
    }
}

fn class_report(confusion: &[[usize; 2]; 2], class: usize) -> ClassReport {
    let true_positive = confusion[class][class];
    let predicted = confusion[0][class] + confusion[1][class];
    let support = confusion[class][0] + confusion[class][1];

    let precision = ratio(true_positive, predicted);
    let recall = ratio(true_positive, support);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    ClassReport {
        precision,
        recall,
        f1,
        support,
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Rank-based ROC AUC (Mann-Whitney U), with average ranks over ties.
/// Returns 0.5 when either class is absent.
pub fn roc_auc(labels: &[u8], probabilities: &[f64]) -> f64 {
    let n = labels.len();
    let positives: usize = labels.iter().map(|&l| l as usize).sum();
    let negatives = n - positives;

    if positives == 0 || negatives == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        probabilities[a]
            .partial_cmp(&probabilities[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Assign average ranks within tie groups, accumulate positive ranks
    let mut positive_rank_sum = 0.0;
    let mut start = 0usize;
    while start < n {
        let mut end = start;
        while end + 1 < n && probabilities[order[end + 1]] == probabilities[order[start]] {
            end += 1;
        }

        // Ranks are 1-based; ties share the group mean
        let mean_rank = (start + end) as f64 / 2.0 + 1.0;
        for &idx in &order[start..=end] {
            if labels[idx] == 1 {
                positive_rank_sum += mean_rank;
            }
        }

        start = end + 1;
    }

    let expected_min = positives as f64 * (positives as f64 + 1.0) / 2.0;
    (positive_rank_sum - expected_min) / (positives as f64 * negatives as f64)
}
