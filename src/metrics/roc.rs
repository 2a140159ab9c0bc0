use super::{MetricsError, check_labels, check_lengths};

use log::warn;

/// Receiver operating characteristic for the positive class (label 1).
#[derive(Debug, Clone, PartialEq)]
pub struct RocCurve {
    pub fpr: Vec<f64>,
    pub tpr: Vec<f64>,
    /// Decreasing; the first entry is `+inf` so the curve starts at (0, 0)
    pub thresholds: Vec<f64>,
}

/// Sweep the decision threshold over every distinct score.
///
/// Points collinear with their neighbours are dropped, which does not change
/// the area under the curve.
pub fn roc_curve(y_true: &[usize], y_score: &[f64]) -> Result<RocCurve, MetricsError> {
    check_lengths(y_true.len(), y_score.len())?;
    check_labels(y_true, 2)?;

    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| y_score[b].total_cmp(&y_score[a]));

    let mut tps = Vec::new();
    let mut fps = Vec::new();
    let mut thresholds = Vec::new();
    let (mut tp, mut fp) = (0.0, 0.0);
    for (pos, &i) in order.iter().enumerate() {
        if y_true[i] == 1 {
            tp += 1.0;
        } else {
            fp += 1.0;
        }
        let run_ends = order
            .get(pos + 1)
            .is_none_or(|&next| y_score[next] != y_score[i]);
        if run_ends {
            tps.push(tp);
            fps.push(fp);
            thresholds.push(y_score[i]);
        }
    }

    let keep: Vec<usize> = (0..tps.len())
        .filter(|&k| {
            k == 0
                || k + 1 == tps.len()
                || second_difference(&fps, k) != 0.0
                || second_difference(&tps, k) != 0.0
        })
        .collect();

    let mut curve_tps = vec![0.0];
    let mut curve_fps = vec![0.0];
    let mut curve_thresholds = vec![f64::INFINITY];
    for k in keep {
        curve_tps.push(tps[k]);
        curve_fps.push(fps[k]);
        curve_thresholds.push(thresholds[k]);
    }

    let positives = *curve_tps.last().unwrap_or(&0.0);
    let negatives = *curve_fps.last().unwrap_or(&0.0);
    if positives == 0.0 {
        warn!("No positive samples in y_true, true positive rate is undefined");
    }
    if negatives == 0.0 {
        warn!("No negative samples in y_true, false positive rate is undefined");
    }

    Ok(RocCurve {
        fpr: curve_fps.iter().map(|f| f / negatives).collect(),
        tpr: curve_tps.iter().map(|t| t / positives).collect(),
        thresholds: curve_thresholds,
    })
}

fn second_difference(values: &[f64], k: usize) -> f64 {
    values[k + 1] - 2.0 * values[k] + values[k - 1]
}

/// Area under a curve by the trapezoidal rule.
///
/// `x` must be monotonic; a decreasing `x` yields the same positive area.
/// NaN coordinates, as left by a single-class ROC curve, are not ordering
/// violations and make the area NaN.
pub fn auc(x: &[f64], y: &[f64]) -> Result<f64, MetricsError> {
    check_lengths(x.len(), y.len())?;
    if x.len() < 2 {
        return Err(MetricsError::TooFewPoints(x.len()));
    }
    let decreases = x.windows(2).any(|w| w[1] < w[0]);
    let direction = if !decreases {
        1.0
    } else if x.windows(2).all(|w| w[1] <= w[0]) {
        -1.0
    } else {
        return Err(MetricsError::NotMonotonic);
    };

    let area: f64 = x
        .windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (xs[1] - xs[0]) * (ys[0] + ys[1]) / 2.0)
        .sum();
    Ok(direction * area)
}
