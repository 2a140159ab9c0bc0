//! Synthetic DICOM series for the integration tests.

#![allow(dead_code)]

use dicom::core::{DataElement, PrimitiveValue, VR, dicom_value};
use dicom::object::{FileMetaTableBuilder, InMemDicomObject};
use dicom_dictionary_std::{tags, uids};
use std::path::{Path, PathBuf};

pub const ROWS: usize = 6;
pub const COLS: usize = 5;
pub const SLICES: usize = 4;
/// Row spacing, column spacing (PixelSpacing order)
pub const PIXEL_SPACING: [f64; 2] = [0.5, 0.75];
pub const SLICE_GAP: f64 = 2.0;

/// Stored value of every voxel, unique per position.
pub fn pixel_value(slice: usize, row: usize, col: usize) -> u16 {
    (slice * 100 + row * 10 + col) as u16
}

pub fn string(tag: dicom::core::Tag, vr: VR, value: &str) -> DataElement<InMemDicomObject> {
    DataElement::new(tag, vr, PrimitiveValue::from(value))
}

/// One slice of the synthetic series, at `slice * SLICE_GAP` along z.
pub fn slice_object(series_uid: &str, sop_uid: &str, slice: usize, instance: i32) -> InMemDicomObject {
    let mut obj = InMemDicomObject::new_empty();
    obj.put(string(tags::SOP_CLASS_UID, VR::UI, uids::MR_IMAGE_STORAGE));
    obj.put(string(tags::SOP_INSTANCE_UID, VR::UI, sop_uid));
    obj.put(string(tags::SERIES_INSTANCE_UID, VR::UI, series_uid));
    obj.put(string(tags::MODALITY, VR::CS, "MR"));
    obj.put(string(tags::PATIENT_POSITION, VR::CS, "HFS"));
    obj.put(DataElement::new(
        tags::INSTANCE_NUMBER,
        VR::IS,
        PrimitiveValue::from(instance.to_string()),
    ));
    obj.put(DataElement::new(
        tags::IMAGE_POSITION_PATIENT,
        VR::DS,
        dicom_value!(Strs, ["-10", "-20", (slice as f64 * SLICE_GAP).to_string()]),
    ));
    obj.put(DataElement::new(
        tags::IMAGE_ORIENTATION_PATIENT,
        VR::DS,
        dicom_value!(Strs, ["1", "0", "0", "0", "1", "0"]),
    ));
    obj.put(DataElement::new(
        tags::PIXEL_SPACING,
        VR::DS,
        dicom_value!(
            Strs,
            [PIXEL_SPACING[0].to_string(), PIXEL_SPACING[1].to_string()]
        ),
    ));
    obj.put(string(tags::SLICE_THICKNESS, VR::DS, "2"));
    obj.put(DataElement::new(tags::ROWS, VR::US, PrimitiveValue::from(ROWS as u16)));
    obj.put(DataElement::new(tags::COLUMNS, VR::US, PrimitiveValue::from(COLS as u16)));
    obj.put(DataElement::new(tags::SAMPLES_PER_PIXEL, VR::US, PrimitiveValue::from(1u16)));
    obj.put(string(tags::PHOTOMETRIC_INTERPRETATION, VR::CS, "MONOCHROME2"));
    obj.put(DataElement::new(tags::BITS_ALLOCATED, VR::US, PrimitiveValue::from(16u16)));
    obj.put(DataElement::new(tags::BITS_STORED, VR::US, PrimitiveValue::from(16u16)));
    obj.put(DataElement::new(tags::HIGH_BIT, VR::US, PrimitiveValue::from(15u16)));
    obj.put(DataElement::new(
        tags::PIXEL_REPRESENTATION,
        VR::US,
        PrimitiveValue::from(0u16),
    ));

    let pixels = (0..ROWS)
        .flat_map(|row| (0..COLS).map(move |col| pixel_value(slice, row, col)))
        .collect();
    obj.put(DataElement::new(
        tags::PIXEL_DATA,
        VR::OW,
        PrimitiveValue::U16(pixels),
    ));
    obj
}

/// Write one slice object as `name` in `dir`.
pub fn write_slice(dir: &Path, name: &str, sop_uid: &str, obj: InMemDicomObject) -> PathBuf {
    let file = obj
        .with_meta(
            FileMetaTableBuilder::new()
                .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
                .media_storage_sop_class_uid(uids::MR_IMAGE_STORAGE)
                .media_storage_sop_instance_uid(sop_uid),
        )
        .unwrap();
    let path = dir.join(name);
    file.write_to_file(&path).unwrap();
    path
}

/// Write a `SLICES` slice axial series into `dir`.
///
/// File names and instance numbers run opposite to the slice positions, so
/// only position based sorting recovers the anatomical order.
pub fn write_series(dir: &Path, series_uid: &str) -> Vec<PathBuf> {
    (0..SLICES)
        .map(|slice| {
            let instance = (SLICES - slice) as i32;
            let sop_uid = format!("{series_uid}.{instance}");
            let obj = slice_object(series_uid, &sop_uid, slice, instance);
            write_slice(dir, &format!("IM-{instance:04}.dcm"), &sop_uid, obj)
        })
        .collect()
}
