//! DICOM series to NIfTI conversion.

use crate::{
    enums::SortBy,
    geometry::Geometry,
    volume::Volume,
    volume_loader::{VolumeLoader, VolumeLoaderError},
};

use log::info;
use nifti::{NiftiHeader, error::NiftiError, writer::WriterOptions};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// NIfTI `xyzt_units` code for millimetres.
const UNITS_MM: u8 = 2;
/// NIfTI xform code for scanner-based anatomical coordinates.
const XFORM_SCANNER_ANAT: i16 = 1;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("No DICOM series found in {}", .0.display())]
    NoSeriesFound(PathBuf),

    #[error(transparent)]
    Load(VolumeLoaderError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("NIfTI error: {0}")]
    Nifti(#[from] NiftiError),
}

impl From<VolumeLoaderError> for ConvertError {
    fn from(err: VolumeLoaderError) -> Self {
        match err {
            VolumeLoaderError::NoSeriesFound(path) => ConvertError::NoSeriesFound(path),
            other => ConvertError::Load(other),
        }
    }
}

/// What a conversion produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionReport {
    pub series_uid: String,
    pub slice_count: usize,
    /// Voxel array shape as written: (columns, rows, slices)
    pub shape: (usize, usize, usize),
    pub spacing: [f64; 3],
    pub output: PathBuf,
}

/// Convert the DICOM series found in `dicom_dir` to a NIfTI file.
///
/// The output is gzip compressed when `output_file` ends in `.gz`. Parent
/// directories are created as needed. Nothing is written unless the whole
/// series was read successfully.
pub fn convert(
    dicom_dir: impl AsRef<Path>,
    output_file: impl AsRef<Path>,
) -> Result<ConversionReport, ConvertError> {
    let dicom_dir = dicom_dir.as_ref();
    let output_file = output_file.as_ref();
    info!("Reading DICOM series from {}", dicom_dir.display());

    let series = VolumeLoader::first_series(dicom_dir)?;
    info!("Found {} DICOM files", series.files.len());
    let volume = VolumeLoader::load_series(&series, SortBy::default())?;

    info!("Writing NIfTI file to {}", output_file.display());
    write_volume(&volume, output_file)?;
    info!("Conversion complete!");

    let (depth, rows, cols) = volume.dim();
    Ok(ConversionReport {
        series_uid: series.uid,
        slice_count: depth,
        shape: (cols, rows, depth),
        spacing: volume.geometry().spacing,
        output: output_file.to_path_buf(),
    })
}

/// Write a volume as NIfTI, with sform and qform both describing its
/// geometry.
pub fn write_volume(volume: &Volume, output_file: &Path) -> Result<(), ConvertError> {
    if let Some(parent) = output_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let header = reference_header(volume.geometry());
    WriterOptions::new(output_file)
        .reference_header(&header)
        .write_nifti(&volume.nifti_view())?;
    Ok(())
}

fn reference_header(geometry: &Geometry) -> NiftiHeader {
    let affine = geometry.affine_ras();
    let ([b, c, d], qfac) = geometry.quaternion();
    let srow = |row: usize| {
        [
            affine[(row, 0)] as f32,
            affine[(row, 1)] as f32,
            affine[(row, 2)] as f32,
            affine[(row, 3)] as f32,
        ]
    };
    let [sx, sy, sz] = geometry.spacing;

    NiftiHeader {
        pixdim: [qfac as f32, sx as f32, sy as f32, sz as f32, 1.0, 1.0, 1.0, 1.0],
        xyzt_units: UNITS_MM,
        qform_code: XFORM_SCANNER_ANAT,
        sform_code: XFORM_SCANNER_ANAT,
        quatern_b: b as f32,
        quatern_c: c as f32,
        quatern_d: d as f32,
        quatern_x: affine[(0, 3)] as f32,
        quatern_y: affine[(1, 3)] as f32,
        quatern_z: affine[(2, 3)] as f32,
        srow_x: srow(0),
        srow_y: srow(1),
        srow_z: srow(2),
        ..NiftiHeader::default()
    }
}
