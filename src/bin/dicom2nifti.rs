//! Convert a directory holding one DICOM series into a NIfTI volume.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use medimg_course::converter;

#[derive(Parser, Debug)]
#[command(author, about, version, long_about)]
struct Args {
    /// directory containing the DICOM files of the series
    #[arg(default_value = "data/example-dicom-structural/dicoms")]
    dicom_dir: PathBuf,

    /// output NIfTI file, gzip compressed when it ends in .gz
    #[arg(default_value = "data/example-dicom-structural/structural.nii.gz")]
    output: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Args::parse();

    let report = converter::convert(&cli.dicom_dir, &cli.output).with_context(|| {
        format!(
            "Error converting {} to {}",
            cli.dicom_dir.display(),
            cli.output.display()
        )
    })?;

    println!(
        "Series {}: {} slices, shape {:?}, spacing {:?}",
        report.series_uid, report.slice_count, report.shape, report.spacing
    );
    Ok(())
}
