use super::{ConfusionMatrix, MetricsError, ratio};

use ndarray::Array2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class metrics plus the accuracy and averaged rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub classes: Vec<(String, ClassMetrics)>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

/// The report as a table without the support column.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsTable {
    pub rows: Vec<String>,
    pub columns: [&'static str; 3],
    /// One row per entry of `rows`: precision, recall, f1-score
    pub values: Array2<f64>,
}

pub fn classification_report(
    y_true: &[usize],
    y_pred: &[usize],
    target_names: &[&str],
) -> Result<ClassificationReport, MetricsError> {
    let cm = ConfusionMatrix::from_labels(y_true, y_pred, target_names.len())?;

    let classes: Vec<(String, ClassMetrics)> = target_names
        .iter()
        .enumerate()
        .map(|(class, name)| {
            let tp = cm.true_positives(class) as f64;
            let fp = cm.false_positives(class) as f64;
            let fn_ = cm.false_negatives(class) as f64;
            let metrics = ClassMetrics {
                precision: ratio(tp, tp + fp),
                recall: ratio(tp, tp + fn_),
                f1: ratio(2.0 * tp, 2.0 * tp + fp + fn_),
                support: cm.support(class),
            };
            (name.to_string(), metrics)
        })
        .collect();

    let total = cm.total();
    let n = classes.len() as f64;
    let average = |weight: &dyn Fn(&ClassMetrics) -> f64, norm: f64| ClassMetrics {
        precision: ratio(classes.iter().map(|(_, m)| weight(m) * m.precision).sum(), norm),
        recall: ratio(classes.iter().map(|(_, m)| weight(m) * m.recall).sum(), norm),
        f1: ratio(classes.iter().map(|(_, m)| weight(m) * m.f1).sum(), norm),
        support: total,
    };
    let macro_avg = average(&|_| 1.0, n);
    let weighted_avg = average(&|m| m.support as f64, total as f64);

    Ok(ClassificationReport {
        accuracy: ratio(cm.correct() as f64, total as f64),
        classes,
        macro_avg,
        weighted_avg,
    })
}

impl ClassificationReport {
    /// Rows: each class, `accuracy`, `macro avg`, `weighted avg`. The
    /// accuracy row repeats the accuracy in every column.
    pub fn to_table(&self) -> MetricsTable {
        let mut rows = Vec::with_capacity(self.classes.len() + 3);
        let mut flat = Vec::with_capacity((self.classes.len() + 3) * 3);
        let mut push = |name: &str, values: [f64; 3]| {
            rows.push(name.to_string());
            flat.extend(values);
        };

        for (name, m) in &self.classes {
            push(name, [m.precision, m.recall, m.f1]);
        }
        push("accuracy", [self.accuracy; 3]);
        for (name, m) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            push(name, [m.precision, m.recall, m.f1]);
        }

        let n_rows = rows.len();
        MetricsTable {
            rows,
            columns: ["precision", "recall", "f1-score"],
            values: Array2::from_shape_fn((n_rows, 3), |(r, c)| flat[r * 3 + c]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMES: [&str; 2] = ["COVID", "NonCOVID"];

    #[test]
    fn per_class_values() {
        let report = classification_report(&[0, 1, 0, 1], &[0, 1, 1, 1], &NAMES).unwrap();
        let (name, covid) = &report.classes[0];
        assert_eq!(name, "COVID");
        assert_eq!(covid.precision, 1.0);
        assert_eq!(covid.recall, 0.5);
        assert!((covid.f1 - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(covid.support, 2);

        let (_, non_covid) = &report.classes[1];
        assert!((non_covid.precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(non_covid.recall, 1.0);
        assert!((non_covid.f1 - 0.8).abs() < 1e-12);
        assert_eq!(report.accuracy, 0.75);
    }

    #[test]
    fn averages() {
        let report = classification_report(&[0, 0, 0, 1], &[0, 0, 1, 1], &NAMES).unwrap();
        // COVID: p=1, r=2/3; NonCOVID: p=1/2, r=1
        assert!((report.macro_avg.precision - 0.75).abs() < 1e-12);
        assert!((report.macro_avg.recall - 5.0 / 6.0).abs() < 1e-12);
        assert!((report.weighted_avg.precision - (3.0 * 1.0 + 0.5) / 4.0).abs() < 1e-12);
        assert!((report.weighted_avg.recall - 0.75).abs() < 1e-12);
        assert_eq!(report.weighted_avg.support, 4);
    }

    #[test]
    fn zero_division_yields_zero() {
        // nothing predicted as NonCOVID
        let report = classification_report(&[0, 1], &[0, 0], &NAMES).unwrap();
        let (_, non_covid) = &report.classes[1];
        assert_eq!(non_covid.precision, 0.0);
        assert_eq!(non_covid.recall, 0.0);
        assert_eq!(non_covid.f1, 0.0);
    }

    #[test]
    fn table_drops_support() {
        let report = classification_report(&[0, 1, 0, 1], &[0, 1, 1, 1], &NAMES).unwrap();
        let table = report.to_table();
        assert_eq!(
            table.rows,
            ["COVID", "NonCOVID", "accuracy", "macro avg", "weighted avg"]
        );
        assert_eq!(table.values.dim(), (5, 3));
        assert!(table.values.row(2).iter().all(|&v| v == 0.75));
        assert_eq!(table.columns, ["precision", "recall", "f1-score"]);
    }
}
