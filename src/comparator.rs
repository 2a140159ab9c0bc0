//! Load one image through every decoder and report how each sees it.
//!
//! Decoders run independently. A failure is logged and leaves that decoder
//! out of the result map; it never stops the others and never reaches the
//! caller.

use crate::{
    decoders::{AffineNiftiDecoder, ItkNiftiDecoder, LoadResult, RawDicomDecoder, SliceDecoder},
    enums::DecoderKind,
    render::{self, RenderError},
};

use log::{error, info, warn};
use ndarray::ArrayViewD;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

/// Results keyed by decoder. A missing key means that decoder failed.
pub type LoadResults = BTreeMap<DecoderKind, LoadResult>;

#[derive(Debug, Clone, Default)]
pub struct CompareOptions {
    /// Plane to display for 3D results; the middle plane when `None`
    pub slice_index: Option<usize>,
    /// Where figures are written; nothing is rendered when `None`
    pub render_dir: Option<PathBuf>,
}

/// Load `dicom_path` with the raw DICOM decoder and, when given,
/// `nifti_path` with both NIfTI decoders.
pub fn load_and_compare(
    dicom_path: &Path,
    nifti_path: Option<&Path>,
    options: &CompareOptions,
) -> LoadResults {
    let mut results = LoadResults::new();
    run_decoder(&RawDicomDecoder, dicom_path, options, &mut results);
    if let Some(nifti_path) = nifti_path {
        run_decoder(&AffineNiftiDecoder, nifti_path, options, &mut results);
        run_decoder(&ItkNiftiDecoder, nifti_path, options, &mut results);
    }
    results
}

fn run_decoder(
    decoder: &dyn SliceDecoder,
    path: &Path,
    options: &CompareOptions,
    results: &mut LoadResults,
) {
    let kind = decoder.kind();
    let mut result = match decoder.load(path) {
        Ok(result) => result,
        Err(e) => {
            error!("Error loading {} with the {kind} decoder: {e}", path.display());
            return;
        }
    };

    info!("{kind} loading:");
    for (key, value) in result.metadata.entries() {
        info!("{key}: {value}");
    }

    let array = result.array.view();
    match select_plane(&array, decoder.stacking_axis(), options.slice_index) {
        Ok((plane, slice_index)) => {
            if let Some(dir) = &options.render_dir {
                let title = match slice_index {
                    Some(index) => format!("{kind} Array Orientation (Slice {index})"),
                    None => format!("{kind} Array Orientation"),
                };
                let path = dir.join(format!("{}_orientation.png", kind.key()));
                match render::render_slice(&plane, &title, Some(decoder.axis_labels()), &path) {
                    Ok(figure) => info!("Rendered {}", figure.png.display()),
                    Err(e) => warn!("Could not render the {kind} slice: {e}"),
                }
            }
            result.slice_index = slice_index;
        }
        Err(e) => warn!("Could not select a {kind} slice: {e}"),
    }

    results.insert(kind, result);
}

/// The plane a decoder displays.
///
/// For 3D arrays with a stacking axis this is `requested`, or the middle
/// index `len / 2` of that axis. Any other array is returned whole and
/// reduced later by [`render::first_plane`].
pub fn select_plane<'a>(
    array: &ArrayViewD<'a, f64>,
    stacking_axis: Option<usize>,
    requested: Option<usize>,
) -> Result<(ArrayViewD<'a, f64>, Option<usize>), RenderError> {
    match stacking_axis {
        Some(axis) if array.ndim() == 3 => {
            let index = requested.unwrap_or(array.shape()[axis] / 2);
            let plane = render::plane_at(array, axis, index)?;
            Ok((plane, Some(index)))
        }
        _ => Ok((array.clone(), None)),
    }
}

/// Side-by-side shapes, available once both the DICOM and ITK decoders
/// succeeded.
pub fn shape_summary(results: &LoadResults) -> Option<Vec<String>> {
    let dicom = results.get(&DecoderKind::Dicom)?;
    let itk = results.get(&DecoderKind::Itk)?;
    let mut lines = vec![
        format!("{} shape: {:?}", DecoderKind::Dicom, dicom.metadata.shape()),
        format!("{} shape: {:?}", DecoderKind::Itk, itk.metadata.shape()),
    ];
    if let Some(nifti) = results.get(&DecoderKind::Nifti) {
        lines.push(format!(
            "{} shape: {:?}",
            DecoderKind::Nifti,
            nifti.metadata.shape()
        ));
    }
    Some(lines)
}
