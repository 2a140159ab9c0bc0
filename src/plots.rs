//! SVG figures for classifier evaluation.
//!
//! Each function computes its metric, draws it with plotters and hands the
//! computed values back so callers can print or test them.

use crate::{
    enums::Class,
    metrics::{
        self, ConfusionMatrix, MetricsError, MetricsTable, RocCurve, classification_report,
    },
    render,
};

use log::info;
use ndarray::{ArrayView2, Axis};
use plotters::{
    drawing::DrawingAreaErrorKind,
    prelude::*,
    style::text_anchor::{HPos, Pos, VPos},
};
use rand::{Rng, seq::index};
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_SAMPLE_COUNT: usize = 4;
/// Sample images are square with this side length.
pub const SAMPLE_SIDE: usize = 64;
const SAMPLE_COLUMNS: usize = 2;

const BLUES: [RGBColor; 5] = [
    RGBColor(247, 251, 255),
    RGBColor(198, 219, 239),
    RGBColor(107, 174, 214),
    RGBColor(33, 113, 181),
    RGBColor(8, 48, 107),
];
const YL_OR_RD: [RGBColor; 5] = [
    RGBColor(255, 255, 204),
    RGBColor(254, 217, 118),
    RGBColor(253, 141, 60),
    RGBColor(227, 26, 28),
    RGBColor(128, 0, 38),
];
const ORANGE: RGBColor = RGBColor(255, 165, 0);
const NAVY: RGBColor = RGBColor(0, 0, 128);

#[derive(Debug, Error)]
pub enum PlotError {
    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error("Requested {requested} samples but only {available} are available")]
    SampleCountTooLarge { requested: usize, available: usize },

    #[error("Expected {expected} values per sample image, found {found}")]
    Shape { expected: usize, found: usize },

    #[error("Drawing error: {0}")]
    Drawing(String),
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for PlotError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        PlotError::Drawing(err.to_string())
    }
}

fn class_names() -> [&'static str; 2] {
    Class::ALL.map(|c| c.name())
}

fn label_name(label: usize) -> &'static str {
    Class::from_label(label).map_or("?", |c| c.name())
}

/// Linear interpolation through evenly spaced palette anchors, `t` in [0, 1].
fn palette(colors: &[RGBColor], t: f64) -> RGBColor {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (colors.len() - 1) as f64;
    let lo = (scaled.floor() as usize).min(colors.len() - 2);
    let frac = scaled - lo as f64;
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    let (a, b) = (colors[lo], colors[lo + 1]);
    RGBColor(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

struct Heatmap<'a> {
    title: &'a str,
    x_desc: &'a str,
    y_desc: &'a str,
    x_names: &'a [&'a str],
    y_names: &'a [String],
    colors: &'a [RGBColor],
    size: (u32, u32),
}

/// Cells of `values` with row 0 on top, each annotated with `annotate`.
fn draw_heatmap(
    path: &Path,
    values: &ArrayView2<'_, f64>,
    figure: &Heatmap<'_>,
    annotate: impl Fn(f64) -> String,
) -> Result<(), PlotError> {
    let (n_rows, n_cols) = values.dim();
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let scale = |v: f64| {
        if max > min {
            (v - min) / (max - min)
        } else {
            0.5
        }
    };

    let root = SVGBackend::new(path, figure.size).into_drawing_area();
    root.fill(&WHITE)?;

    // discrete u32 ranges are inclusive, so 0..n-1 gives n segments
    let mut chart = ChartBuilder::on(&root)
        .caption(figure.title, ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(110)
        .build_cartesian_2d(
            (0u32..n_cols as u32 - 1).into_segmented(),
            (0u32..n_rows as u32 - 1).into_segmented(),
        )?;

    let column_label = |v: &SegmentValue<u32>| match v {
        SegmentValue::CenterOf(i) => figure
            .x_names
            .get(*i as usize)
            .copied()
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    };
    // row 0 is drawn at the top
    let row_label = |v: &SegmentValue<u32>| match v {
        SegmentValue::CenterOf(i) => figure
            .y_names
            .get(n_rows - 1 - *i as usize)
            .cloned()
            .unwrap_or_default(),
        _ => String::new(),
    };
    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(figure.x_desc)
        .y_desc(figure.y_desc)
        .x_label_formatter(&column_label)
        .y_label_formatter(&row_label)
        .axis_desc_style(("sans-serif", 16))
        .draw()?;

    let flip = |r: usize| (n_rows - 1 - r) as u32;
    chart.draw_series(values.indexed_iter().map(|((r, c), &v)| {
        Rectangle::new(
            [
                (SegmentValue::Exact(c as u32), SegmentValue::Exact(flip(r))),
                (SegmentValue::Exact(c as u32 + 1), SegmentValue::Exact(flip(r) + 1)),
            ],
            palette(figure.colors, scale(v)).filled(),
        )
    }))?;
    chart.draw_series(values.indexed_iter().map(|((r, c), &v)| {
        let color = if scale(v) > 0.5 { WHITE } else { BLACK };
        let style = ("sans-serif", 18)
            .into_font()
            .color(&color)
            .pos(Pos::new(HPos::Center, VPos::Center));
        Text::new(
            annotate(v),
            (SegmentValue::CenterOf(c as u32), SegmentValue::CenterOf(flip(r))),
            style,
        )
    }))?;

    root.present()?;
    Ok(())
}

/// Confusion matrix heatmap with COVID / NonCOVID ticks.
pub fn plot_confusion_matrix(
    y_true: &[usize],
    y_pred: &[usize],
    path: &Path,
) -> Result<ConfusionMatrix, PlotError> {
    let names = class_names();
    let cm = ConfusionMatrix::from_labels(y_true, y_pred, names.len())?;
    let values = cm.counts().mapv(|c| c as f64);
    let y_names = names.map(String::from);

    draw_heatmap(
        path,
        &values.view(),
        &Heatmap {
            title: "Confusion Matrix",
            x_desc: "Predicted",
            y_desc: "True",
            x_names: &names,
            y_names: &y_names,
            colors: &BLUES,
            size: (800, 600),
        },
        |v| format!("{v:.0}"),
    )?;
    info!("Confusion matrix written to {}", path.display());
    Ok(cm)
}

/// Draw `n_samples` random rows of `x_test` as 64x64 images, two per row,
/// titled with the true and predicted class. Returns the chosen indices.
pub fn plot_sample_images<R: Rng + ?Sized>(
    x_test: &ArrayView2<'_, f64>,
    y_test: &[usize],
    y_pred: &[usize],
    n_samples: usize,
    rng: &mut R,
    path: &Path,
) -> Result<Vec<usize>, PlotError> {
    let available = x_test.nrows();
    metrics::check_lengths(available, y_test.len())?;
    metrics::check_lengths(available, y_pred.len())?;
    if n_samples > available {
        return Err(PlotError::SampleCountTooLarge {
            requested: n_samples,
            available,
        });
    }
    let expected = SAMPLE_SIDE * SAMPLE_SIDE;
    if x_test.ncols() != expected {
        return Err(PlotError::Shape {
            expected,
            found: x_test.ncols(),
        });
    }

    let indices = index::sample(rng, available, n_samples).into_vec();

    let grid_rows = n_samples.div_ceil(SAMPLE_COLUMNS).max(1);
    let root = SVGBackend::new(path, (600, 320 * grid_rows as u32)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((grid_rows, SAMPLE_COLUMNS));

    for (panel, &i) in panels.iter().zip(&indices) {
        let image = x_test
            .index_axis(Axis(0), i)
            .into_shape_with_order((SAMPLE_SIDE, SAMPLE_SIDE))
            .map_err(|_| PlotError::Shape {
                expected,
                found: x_test.ncols(),
            })?;
        let normalized = render::normalize(&image);
        let title = format!(
            "True: {} / Pred: {}",
            label_name(y_test[i]),
            label_name(y_pred[i])
        );

        let side = SAMPLE_SIDE as i32;
        let mut chart = ChartBuilder::on(panel)
            .caption(title, ("sans-serif", 16))
            .margin(10)
            .build_cartesian_2d(0..side, 0..side)?;
        chart.draw_series(normalized.indexed_iter().map(|((r, c), &v)| {
            let g = if v.is_finite() { (v * 255.0).round() as u8 } else { 0 };
            let (x, y) = (c as i32, side - 1 - r as i32);
            Rectangle::new([(x, y), (x + 1, y + 1)], RGBColor(g, g, g).filled())
        }))?;
    }

    root.present()?;
    info!("Sample predictions written to {}", path.display());
    Ok(indices)
}

/// ROC curve for the positive class with a chance diagonal.
pub fn plot_roc_curve(
    y_true: &[usize],
    y_score: &[f64],
    path: &Path,
) -> Result<(RocCurve, f64), PlotError> {
    let curve = metrics::roc_curve(y_true, y_score)?;
    let area = metrics::auc(&curve.fpr, &curve.tpr)?;

    let root = SVGBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Receiver Operating Characteristic (ROC) Curve", ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..1.0, 0.0..1.05)?;
    chart
        .configure_mesh()
        .x_desc("False Positive Rate")
        .y_desc("True Positive Rate")
        .draw()?;

    chart
        .draw_series(LineSeries::new(
            curve.fpr.iter().copied().zip(curve.tpr.iter().copied()),
            ORANGE.stroke_width(2),
        ))?
        .label(format!("ROC curve (AUC = {area:.2})"))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], ORANGE.stroke_width(2)));
    chart.draw_series(DashedLineSeries::new(
        [(0.0, 0.0), (1.0, 1.0)],
        5,
        5,
        NAVY.stroke_width(2),
    ))?;

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    info!("ROC curve written to {} (AUC = {area:.4})", path.display());
    Ok((curve, area))
}

/// Per-class precision, recall and F1 as an annotated heatmap.
pub fn plot_metrics_table(
    y_true: &[usize],
    y_pred: &[usize],
    path: &Path,
) -> Result<MetricsTable, PlotError> {
    let table = classification_report(y_true, y_pred, &class_names())?.to_table();

    draw_heatmap(
        path,
        &table.values.view(),
        &Heatmap {
            title: "Detailed Classification Metrics",
            x_desc: "",
            y_desc: "",
            x_names: &table.columns,
            y_names: &table.rows,
            colors: &YL_OR_RD,
            size: (1000, 600),
        },
        |v| format!("{v:.2}"),
    )?;
    info!("Metrics table written to {}", path.display());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use rand::{SeedableRng, rngs::StdRng};
    use std::collections::HashSet;

    const Y_TRUE: [usize; 6] = [0, 0, 1, 1, 0, 1];
    const Y_PRED: [usize; 6] = [0, 1, 1, 1, 0, 0];

    #[test]
    fn palette_hits_anchors() {
        assert_eq!(palette(&BLUES, 0.0), BLUES[0]);
        assert_eq!(palette(&BLUES, 1.0), BLUES[4]);
        assert_eq!(palette(&BLUES, 0.5), BLUES[2]);
        assert_eq!(palette(&BLUES, f64::NAN), BLUES[0]);
    }

    #[test]
    fn confusion_matrix_plot() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("confusion_matrix.svg");
        let cm = plot_confusion_matrix(&Y_TRUE, &Y_PRED, &path).unwrap();
        assert_eq!(cm.counts(), &ndarray::array![[2, 1], [1, 2]]);
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("Confusion Matrix"));
        assert!(svg.contains("NonCOVID"));
    }

    #[test]
    fn confusion_matrix_propagates_length_mismatch() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("cm.svg");
        let err = plot_confusion_matrix(&[0, 1], &[0], &path).unwrap_err();
        assert!(matches!(err, PlotError::Metrics(MetricsError::LengthMismatch { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn sample_images_are_distinct() {
        let temp = tempfile::tempdir().unwrap();
        let x = Array2::from_shape_fn((10, SAMPLE_SIDE * SAMPLE_SIDE), |(i, j)| (i + j) as f64);
        let y = [0, 1, 0, 1, 0, 1, 0, 1, 0, 1];
        let mut rng = StdRng::seed_from_u64(7);
        let path = temp.path().join("samples.svg");

        let chosen =
            plot_sample_images(&x.view(), &y, &y, DEFAULT_SAMPLE_COUNT, &mut rng, &path).unwrap();
        assert_eq!(chosen.len(), DEFAULT_SAMPLE_COUNT);
        assert_eq!(chosen.iter().collect::<HashSet<_>>().len(), DEFAULT_SAMPLE_COUNT);
        assert!(chosen.iter().all(|&i| i < 10));
        assert!(std::fs::read_to_string(&path).unwrap().contains("True: "));
    }

    #[test]
    fn sample_images_reject_bad_input() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("samples.svg");
        let mut rng = StdRng::seed_from_u64(1);

        let x = Array2::<f64>::zeros((3, SAMPLE_SIDE * SAMPLE_SIDE));
        let err = plot_sample_images(&x.view(), &[0; 3], &[0; 3], 4, &mut rng, &path).unwrap_err();
        assert!(matches!(
            err,
            PlotError::SampleCountTooLarge {
                requested: 4,
                available: 3
            }
        ));

        let x = Array2::<f64>::zeros((3, 100));
        let err = plot_sample_images(&x.view(), &[0; 3], &[0; 3], 2, &mut rng, &path).unwrap_err();
        assert!(matches!(err, PlotError::Shape { found: 100, .. }));
    }

    #[test]
    fn roc_plot_reports_auc() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("roc_curve.svg");
        let (curve, area) =
            plot_roc_curve(&[0, 0, 1, 1], &[0.1, 0.4, 0.35, 0.8], &path).unwrap();
        assert_eq!(area, 0.75);
        assert_eq!(curve.fpr.len(), curve.tpr.len());
        assert!(std::fs::read_to_string(&path).unwrap().contains("AUC = 0.75"));
    }

    #[test]
    fn roc_plot_tolerates_a_single_class() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("roc_curve.svg");
        let (_, area) = plot_roc_curve(&[1, 1, 1], &[0.2, 0.5, 0.9], &path).unwrap();
        assert!(area.is_nan());
        assert!(path.exists());
    }

    #[test]
    fn metrics_table_plot() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("metrics_table.svg");
        let table = plot_metrics_table(&Y_TRUE, &Y_PRED, &path).unwrap();
        assert_eq!(table.rows.len(), 5);
        assert!((table.values[[2, 0]] - 4.0 / 6.0).abs() < 1e-12);
        assert!(std::fs::read_to_string(&path).unwrap().contains("0.67"));
    }
}
