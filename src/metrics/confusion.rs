use super::{MetricsError, check_labels, check_lengths};

use ndarray::{Array2, Axis};

/// Counts of (true class, predicted class) pairs.
///
/// Rows are true classes, columns predicted classes, both in label order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    counts: Array2<usize>,
}

impl ConfusionMatrix {
    pub fn from_labels(
        y_true: &[usize],
        y_pred: &[usize],
        n_classes: usize,
    ) -> Result<Self, MetricsError> {
        check_lengths(y_true.len(), y_pred.len())?;
        check_labels(y_true, n_classes)?;
        check_labels(y_pred, n_classes)?;

        let mut counts = Array2::zeros((n_classes, n_classes));
        for (&actual, &predicted) in y_true.iter().zip(y_pred) {
            counts[[actual, predicted]] += 1;
        }
        Ok(Self { counts })
    }

    pub fn counts(&self) -> &Array2<usize> {
        &self.counts
    }

    pub fn n_classes(&self) -> usize {
        self.counts.nrows()
    }

    pub fn get(&self, actual: usize, predicted: usize) -> usize {
        self.counts[[actual, predicted]]
    }

    pub fn total(&self) -> usize {
        self.counts.sum()
    }

    pub fn true_positives(&self, class: usize) -> usize {
        self.counts[[class, class]]
    }

    /// Samples of other classes predicted as `class`.
    pub fn false_positives(&self, class: usize) -> usize {
        self.counts.index_axis(Axis(1), class).sum() - self.true_positives(class)
    }

    /// Samples of `class` predicted as something else.
    pub fn false_negatives(&self, class: usize) -> usize {
        self.support(class) - self.true_positives(class)
    }

    /// Number of samples whose true class is `class`.
    pub fn support(&self, class: usize) -> usize {
        self.counts.index_axis(Axis(0), class).sum()
    }

    pub fn correct(&self) -> usize {
        self.counts.diag().sum()
    }
}
