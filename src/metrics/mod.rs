//! Evaluation metrics for the two-class COVID / NonCOVID classifier.
//!
//! - Confusion matrix
//! - ROC curve and area under it
//! - Per-class precision, recall, F1 with accuracy, macro and weighted rows

mod confusion;
mod report;
mod roc;

pub use confusion::ConfusionMatrix;
pub use report::{ClassMetrics, ClassificationReport, MetricsTable, classification_report};
pub use roc::{RocCurve, auc, roc_curve};

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MetricsError {
    #[error("Length mismatch: {left} vs {right} samples")]
    LengthMismatch { left: usize, right: usize },

    #[error("Label {label} out of range for {n_classes} classes")]
    LabelOutOfRange { label: usize, n_classes: usize },

    #[error("At least 2 points are needed to compute an area, found {0}")]
    TooFewPoints(usize),

    #[error("x values are neither increasing nor decreasing")]
    NotMonotonic,
}

pub(crate) fn check_lengths(left: usize, right: usize) -> Result<(), MetricsError> {
    if left != right {
        return Err(MetricsError::LengthMismatch { left, right });
    }
    Ok(())
}

pub(crate) fn check_labels(labels: &[usize], n_classes: usize) -> Result<(), MetricsError> {
    match labels.iter().find(|&&label| label >= n_classes) {
        Some(&label) => Err(MetricsError::LabelOutOfRange { label, n_classes }),
        None => Ok(()),
    }
}

/// `numerator / denominator`, 0.0 when the denominator is zero.
pub(crate) fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
