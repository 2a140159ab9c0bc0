//! Plot classifier evaluation figures from a predictions CSV.
//!
//! The predictions file has one row per test sample with the columns
//! `y_true,y_pred,y_score` (labels 0 = COVID, 1 = NonCOVID). An optional
//! features file holds one flattened 64x64 image per row, in the same order.

use anyhow::{Context, Result};
use clap::Parser;
use ndarray::Array2;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use medimg_course::plots::{self, DEFAULT_SAMPLE_COUNT};

#[derive(Parser, Debug)]
#[command(author, about, version, long_about)]
struct Args {
    /// CSV with y_true, y_pred and y_score columns
    predictions: PathBuf,

    /// directory receiving the SVG figures
    #[arg(short, long, default_value = "figures")]
    out: PathBuf,

    /// headerless CSV of flattened 64x64 test images, one per row
    #[arg(short, long)]
    samples: Option<PathBuf>,

    /// number of sample images to draw
    #[arg(short, long, default_value_t = DEFAULT_SAMPLE_COUNT)]
    n_samples: usize,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    y_true: usize,
    y_pred: usize,
    y_score: f64,
}

fn read_predictions(path: &Path) -> Result<Vec<Prediction>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("Error opening {}", path.display()))?;
    reader
        .deserialize()
        .collect::<Result<Vec<Prediction>, _>>()
        .with_context(|| format!("Error parsing {}", path.display()))
}

fn read_features(path: &Path) -> Result<Array2<f64>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Error opening {}", path.display()))?;
    let rows = reader
        .deserialize()
        .collect::<Result<Vec<Vec<f64>>, _>>()
        .with_context(|| format!("Error parsing {}", path.display()))?;
    let n_cols = rows.first().map_or(0, Vec::len);
    let n_rows = rows.len();
    Array2::from_shape_vec((n_rows, n_cols), rows.into_iter().flatten().collect())
        .with_context(|| format!("Rows of {} differ in length", path.display()))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Args::parse();

    let predictions = read_predictions(&cli.predictions)?;
    let y_true: Vec<usize> = predictions.iter().map(|p| p.y_true).collect();
    let y_pred: Vec<usize> = predictions.iter().map(|p| p.y_pred).collect();
    let y_score: Vec<f64> = predictions.iter().map(|p| p.y_score).collect();

    std::fs::create_dir_all(&cli.out)
        .with_context(|| format!("Error creating {}", cli.out.display()))?;

    let cm = plots::plot_confusion_matrix(&y_true, &y_pred, &cli.out.join("confusion_matrix.svg"))?;
    println!("Confusion matrix:\n{}", cm.counts());

    let (_, area) = plots::plot_roc_curve(&y_true, &y_score, &cli.out.join("roc_curve.svg"))?;
    println!("AUC: {area:.4}");

    let table = plots::plot_metrics_table(&y_true, &y_pred, &cli.out.join("metrics_table.svg"))?;
    println!("{:>14} {:>10} {:>10} {:>10}", "", table.columns[0], table.columns[1], table.columns[2]);
    for (name, row) in table.rows.iter().zip(table.values.rows()) {
        println!("{name:>14} {:>10.2} {:>10.2} {:>10.2}", row[0], row[1], row[2]);
    }

    if let Some(samples) = &cli.samples {
        let x_test = read_features(samples)?;
        let chosen = plots::plot_sample_images(
            &x_test.view(),
            &y_true,
            &y_pred,
            cli.n_samples,
            &mut rand::thread_rng(),
            &cli.out.join("sample_predictions.svg"),
        )?;
        println!("Sample indices: {chosen:?}");
    }
    Ok(())
}
