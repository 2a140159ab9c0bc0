//! Load the same study through the raw DICOM, affine NIfTI and ITK-style
//! NIfTI decoders and render one slice of each for visual comparison.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use medimg_course::comparator::{self, CompareOptions};

#[derive(Parser, Debug)]
#[command(author, about, version, long_about)]
struct Args {
    /// directory of DICOM files; the first .dcm file by name is loaded
    #[arg(default_value = "data/example-dicom-structural/dicoms")]
    dicom_dir: PathBuf,

    /// NIfTI file of the same study
    #[arg(default_value = "data/example-dicom-structural/structural.nii.gz")]
    nifti: PathBuf,

    /// slice to display for 3D volumes, the middle slice when omitted
    #[arg(short, long)]
    slice: Option<usize>,

    /// directory receiving the orientation figures
    #[arg(short, long, default_value = "figures")]
    out: PathBuf,
}

fn first_dicom_file(dir: &Path) -> Result<Option<PathBuf>> {
    let mut files = std::fs::read_dir(dir)
        .with_context(|| format!("Error listing {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "dcm"))
        .collect::<Vec<_>>();
    files.sort();
    Ok(files.into_iter().next())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Args::parse();

    println!(
        "DICOM directory exists: {} ({})",
        cli.dicom_dir.is_dir(),
        cli.dicom_dir.display()
    );
    println!(
        "NIfTI file exists: {} ({})",
        cli.nifti.is_file(),
        cli.nifti.display()
    );

    let dicom_file = if cli.dicom_dir.is_dir() {
        first_dicom_file(&cli.dicom_dir)?
    } else {
        None
    };
    let Some(dicom_file) = dicom_file else {
        anyhow::bail!("No .dcm files found in {}", cli.dicom_dir.display());
    };
    println!("Using DICOM file: {}", dicom_file.display());

    let options = CompareOptions {
        slice_index: cli.slice,
        render_dir: Some(cli.out.clone()),
    };
    let nifti = cli.nifti.is_file().then_some(cli.nifti.as_path());
    let results = comparator::load_and_compare(&dicom_file, nifti, &options);

    match comparator::shape_summary(&results) {
        Some(lines) => {
            println!("\nShape comparison:");
            for line in lines {
                println!("{line}");
            }
        }
        None => println!("\nShape comparison unavailable: a decoder failed"),
    }
    println!("Figures written to {}", cli.out.display());
    Ok(())
}
