//! Typed accessors for the handful of attributes the loaders read.
//!
//! Every accessor returns `None` when the attribute is absent or cannot be
//! converted, so callers decide what a missing value means.

use dicom::core::Tag;
use dicom::object::{FileDicomObject, InMemDicomObject};
use dicom_dictionary_std::tags;
use nalgebra::Vector3;

pub(crate) type DicomFile = FileDicomObject<InMemDicomObject>;

pub(crate) fn string(obj: &DicomFile, tag: Tag) -> Option<String> {
    let value = obj.element(tag).ok()?.to_str().ok()?;
    let trimmed = value.trim_end_matches(['\0', ' ']).trim_start();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub(crate) fn int(obj: &DicomFile, tag: Tag) -> Option<i32> {
    obj.element(tag).ok()?.to_int::<i32>().ok()
}

pub(crate) fn float(obj: &DicomFile, tag: Tag) -> Option<f64> {
    obj.element(tag).ok()?.to_float64().ok()
}

pub(crate) fn floats(obj: &DicomFile, tag: Tag) -> Option<Vec<f64>> {
    obj.element(tag).ok()?.to_multi_float64().ok()
}

pub(crate) fn position(obj: &DicomFile) -> Option<Vector3<f64>> {
    match floats(obj, tags::IMAGE_POSITION_PATIENT)?.as_slice() {
        [x, y, z] => Some(Vector3::new(*x, *y, *z)),
        _ => None,
    }
}

/// Row and column direction cosines, normalized.
pub(crate) fn orientation(obj: &DicomFile) -> Option<Result<[Vector3<f64>; 2], usize>> {
    let values = floats(obj, tags::IMAGE_ORIENTATION_PATIENT)?;
    if values.len() != 6 {
        return Some(Err(values.len()));
    }
    let row = Vector3::new(values[0], values[1], values[2]).normalize();
    let col = Vector3::new(values[3], values[4], values[5]).normalize();
    Some(Ok([row, col]))
}
