use crate::{
    dicom_tags::{self, DicomFile},
    enums::SortBy,
    geometry::Geometry,
    volume::Volume,
};

use dicom::{
    object::{OpenFileOptions, open_file},
    pixeldata::{ConvertOptions, PixelDecoder, VoiLutOption},
};
use dicom_dictionary_std::tags;
use log::{debug, info, warn};
use nalgebra::{Matrix3, Vector3};
use ndarray::{Array2, Array3, s};
use rayon::prelude::*;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Relative spread of slice gaps above which a series is reported as
/// non-uniform.
const SPACING_TOLERANCE: f64 = 0.01;
const ORIENTATION_TOLERANCE: f64 = 1e-3;

#[derive(Debug, Error)]
pub enum VolumeLoaderError {
    #[error("No DICOM series found in {}", .0.display())]
    NoSeriesFound(PathBuf),

    #[error("No valid DICOM images found")]
    NoValidImages,

    #[error("Inconsistent image dimensions: expected {expected:?}, found {found:?}")]
    InconsistentDimensions {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Inconsistent ImageOrientationPatient in series")]
    InconsistentOrientation,

    #[error("ImageOrientationPatient must have 6 values, found {0}")]
    InvalidOrientation(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),

    #[error("Pixel data error: {0}")]
    PixelData(#[from] dicom::pixeldata::Error),
}

/// Files of one directory sharing a SeriesInstanceUID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DicomSeries {
    pub uid: String,
    pub files: Vec<PathBuf>,
}

/// Scan a directory for DICOM files and group them by SeriesInstanceUID.
///
/// Headers are parsed in parallel and only up to the pixel data. Files that
/// are not DICOM, or carry no series UID, are skipped. Series come back
/// ordered by UID, their files ordered by path.
pub fn scan_directory(dir: impl AsRef<Path>) -> Result<Vec<DicomSeries>, VolumeLoaderError> {
    let paths: Vec<_> = fs::read_dir(dir.as_ref())?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();

    let tagged: Vec<(String, PathBuf)> = paths
        .par_iter()
        .filter_map(|path| {
            let header = match OpenFileOptions::new()
                .read_until(tags::PIXEL_DATA)
                .open_file(path)
            {
                Ok(header) => header,
                Err(e) => {
                    debug!("Skipping {}: {e}", path.display());
                    return None;
                }
            };
            match dicom_tags::string(&header, tags::SERIES_INSTANCE_UID) {
                Some(uid) => Some((uid, path.clone())),
                None => {
                    debug!("Skipping {}: no SeriesInstanceUID", path.display());
                    None
                }
            }
        })
        .collect();

    let mut grouped: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for (uid, path) in tagged {
        grouped.entry(uid).or_default().push(path);
    }

    Ok(grouped
        .into_iter()
        .map(|(uid, mut files)| {
            files.sort();
            DicomSeries { uid, files }
        })
        .collect())
}

struct SliceHeader {
    object: DicomFile,
    position: Option<Vector3<f64>>,
    instance_number: Option<i32>,
}

pub struct VolumeLoader;

impl VolumeLoader {
    /// Load the first series (lowest SeriesInstanceUID) of a directory.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeLoaderError::NoSeriesFound`] when the path is not a
    /// directory or holds no DICOM series.
    pub fn load_from_directory(
        path: impl AsRef<Path>,
        sort_by: SortBy,
    ) -> Result<(DicomSeries, Volume), VolumeLoaderError> {
        let series = Self::first_series(path.as_ref())?;
        let volume = Self::load_series(&series, sort_by)?;
        Ok((series, volume))
    }

    /// Pick the series a directory conversion operates on.
    pub fn first_series(path: &Path) -> Result<DicomSeries, VolumeLoaderError> {
        if !path.is_dir() {
            return Err(VolumeLoaderError::NoSeriesFound(path.to_path_buf()));
        }
        let mut series_list = scan_directory(path)?;
        if series_list.len() > 1 {
            warn!(
                "{} series found in {}, using {}",
                series_list.len(),
                path.display(),
                series_list[0].uid
            );
        }
        if series_list.is_empty() {
            return Err(VolumeLoaderError::NoSeriesFound(path.to_path_buf()));
        }
        Ok(series_list.swap_remove(0))
    }

    /// Load a volume from the files of one series
    pub fn load_series(series: &DicomSeries, sort_by: SortBy) -> Result<Volume, VolumeLoaderError> {
        let objects = series
            .files
            .par_iter()
            .map(open_file)
            .collect::<Result<Vec<_>, _>>()?;
        Self::load_from_dicom_objects(objects, sort_by)
    }

    /// Load a volume from DICOM objects
    ///
    /// # Arguments
    ///
    /// * `dicom_objects` - DICOM file objects of a single series
    /// * `sort_by` - Method to sort the slices
    ///
    /// # Errors
    ///
    /// Returns error if no objects are given, pixel data cannot be decoded,
    /// or dimensions or orientations are inconsistent
    pub fn load_from_dicom_objects(
        dicom_objects: Vec<DicomFile>,
        sort_by: SortBy,
    ) -> Result<Volume, VolumeLoaderError> {
        if dicom_objects.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }

        let [row_dir, col_dir] = match dicom_tags::orientation(&dicom_objects[0]) {
            Some(Ok(cosines)) => cosines,
            Some(Err(len)) => return Err(VolumeLoaderError::InvalidOrientation(len)),
            None => {
                warn!("Missing ImageOrientationPatient, assuming axial identity orientation");
                [Vector3::x(), Vector3::y()]
            }
        };
        let normal = row_dir.cross(&col_dir).normalize();

        let mut slices: Vec<_> = dicom_objects
            .into_iter()
            .map(|object| SliceHeader {
                position: dicom_tags::position(&object),
                instance_number: dicom_tags::int(&object, tags::INSTANCE_NUMBER),
                object,
            })
            .collect();

        Self::sort_slices(&mut slices, sort_by, &normal);
        Self::validate_orientation(&slices, &row_dir, &col_dir)?;

        let images = slices
            .par_iter()
            .map(|slice| Self::decode_image(&slice.object))
            .collect::<Result<Vec<_>, _>>()?;
        Self::validate_dimensions(&images)?;

        let geometry = Self::build_geometry(&slices, row_dir, col_dir, normal);
        let volume_array = Self::build_volume_array(&images);
        info!(
            "Reconstructed volume {:?} with spacing {:?}",
            volume_array.dim(),
            geometry.spacing
        );

        Ok(Volume::new(volume_array, geometry))
    }

    fn sort_slices(slices: &mut [SliceHeader], sort_by: SortBy, normal: &Vector3<f64>) {
        let sort_by = match sort_by {
            SortBy::ImagePositionPatient if slices.iter().any(|s| s.position.is_none()) => {
                warn!("ImagePositionPatient missing on some slices, sorting by InstanceNumber");
                SortBy::InstanceNumber
            }
            other => other,
        };

        match sort_by {
            SortBy::ImagePositionPatient => slices.sort_by(|a, b| {
                let da = a.position.map_or(0.0, |p| p.dot(normal));
                let db = b.position.map_or(0.0, |p| p.dot(normal));
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            }),
            SortBy::InstanceNumber => slices.sort_by_key(|s| s.instance_number),
            SortBy::None => {}
        }
    }

    fn validate_orientation(
        slices: &[SliceHeader],
        row_dir: &Vector3<f64>,
        col_dir: &Vector3<f64>,
    ) -> Result<(), VolumeLoaderError> {
        for slice in slices {
            if let Some(Ok([row, col])) = dicom_tags::orientation(&slice.object) {
                if (row - row_dir).norm() > ORIENTATION_TOLERANCE
                    || (col - col_dir).norm() > ORIENTATION_TOLERANCE
                {
                    return Err(VolumeLoaderError::InconsistentOrientation);
                }
            }
        }
        Ok(())
    }

    fn decode_image(dicom_object: &DicomFile) -> Result<Array2<f32>, VolumeLoaderError> {
        let pixel_data = dicom_object.decode_pixel_data()?;
        // modality LUT (rescale) applies, display windowing does not
        let options = ConvertOptions::new().with_voi_lut(VoiLutOption::Identity);
        let frames = pixel_data.to_ndarray_with_options::<f32>(&options)?;
        Ok(frames.slice_move(s![0, .., .., 0]))
    }

    fn validate_dimensions(images: &[Array2<f32>]) -> Result<(), VolumeLoaderError> {
        let expected = images[0].dim();
        match images.iter().find(|img| img.dim() != expected) {
            Some(img) => Err(VolumeLoaderError::InconsistentDimensions {
                expected,
                found: img.dim(),
            }),
            None => Ok(()),
        }
    }

    fn build_volume_array(images: &[Array2<f32>]) -> Array3<f32> {
        let (height, width) = images[0].dim();
        let depth = images.len();
        let mut volume = Array3::<f32>::zeros((depth, height, width));

        for (i, image) in images.iter().enumerate() {
            volume.slice_mut(s![i, .., ..]).assign(image);
        }

        volume
    }

    fn build_geometry(
        slices: &[SliceHeader],
        row_dir: Vector3<f64>,
        col_dir: Vector3<f64>,
        normal: Vector3<f64>,
    ) -> Geometry {
        let first = &slices[0].object;
        let (row_spacing, col_spacing) = match dicom_tags::floats(first, tags::PIXEL_SPACING)
            .as_deref()
        {
            Some([row, col, ..]) => (*row, *col),
            _ => {
                warn!("Missing PixelSpacing, assuming 1.0 mm");
                (1.0, 1.0)
            }
        };
        let slice_spacing = Self::slice_spacing(slices, &normal)
            .unwrap_or_else(|| dicom_tags::float(first, tags::SLICE_THICKNESS).unwrap_or(1.0));
        let origin = slices[0]
            .position
            .map_or([0.0; 3], |p| [p.x, p.y, p.z]);
        let slice_dir = Self::stacking_direction(slices, normal);

        Geometry::new(
            origin,
            [col_spacing, row_spacing, slice_spacing],
            Matrix3::from_columns(&[row_dir, col_dir, slice_dir]),
        )
    }

    /// Direction in which the stacked slices advance: the normal, or its
    /// opposite when the first slice lies further along the normal than the last.
    fn stacking_direction(slices: &[SliceHeader], normal: Vector3<f64>) -> Vector3<f64> {
        let first = slices.first().and_then(|s| s.position);
        let last = slices.last().and_then(|s| s.position);
        match (first, last) {
            (Some(first), Some(last)) if (last - first).dot(&normal) < 0.0 => -normal,
            _ => normal,
        }
    }

    /// Mean distance between consecutive slice positions along the normal.
    fn slice_spacing(slices: &[SliceHeader], normal: &Vector3<f64>) -> Option<f64> {
        let positions: Vec<_> = slices.iter().map(|s| s.position).collect::<Option<_>>()?;
        if positions.len() < 2 {
            return None;
        }
        let gaps: Vec<f64> = positions
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).dot(normal).abs())
            .collect();
        let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;
        if mean <= f64::EPSILON {
            warn!("All slices share one position, falling back to SliceThickness");
            return None;
        }
        let min = gaps.iter().copied().fold(f64::INFINITY, f64::min);
        let max = gaps.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if max - min > SPACING_TOLERANCE * mean {
            warn!("Non-uniform slice spacing: min={min:.4}, max={max:.4}, mean={mean:.4}");
        }
        Some(mean)
    }
}
