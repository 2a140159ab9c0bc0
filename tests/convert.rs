mod common;

use common::{COLS, PIXEL_SPACING, ROWS, SLICE_GAP, SLICES, pixel_value};
use dicom::core::{DataElement, VR, dicom_value};
use dicom_dictionary_std::tags;
use medimg_course::{SortBy, VolumeLoader, VolumeLoaderError, converter, converter::ConvertError};
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};

#[test]
fn converted_volume_keeps_shape_spacing_and_order() {
    let temp = tempfile::tempdir().unwrap();
    let dicom_dir = temp.path().join("dicoms");
    std::fs::create_dir(&dicom_dir).unwrap();
    common::write_series(&dicom_dir, "1.2.826.0.1.3680043.2.1125.1");
    let output = temp.path().join("out").join("structural.nii.gz");

    let report = converter::convert(&dicom_dir, &output).unwrap();
    assert_eq!(report.slice_count, SLICES);
    assert_eq!(report.shape, (COLS, ROWS, SLICES));
    assert_eq!(report.series_uid, "1.2.826.0.1.3680043.2.1125.1");
    assert!(output.exists());

    let obj = ReaderOptions::new().read_file(&output).unwrap();
    let header = obj.header().clone();
    assert_eq!(&header.dim[..4], &[3, COLS as u16, ROWS as u16, SLICES as u16]);

    // column norms of the affine are the voxel spacing
    let affine = header.affine::<f64>();
    let norm = |c: usize| (0..3).map(|r| affine[(r, c)].powi(2)).sum::<f64>().sqrt();
    assert!((norm(0) - PIXEL_SPACING[1]).abs() < 1e-5);
    assert!((norm(1) - PIXEL_SPACING[0]).abs() < 1e-5);
    assert!((norm(2) - SLICE_GAP).abs() < 1e-5);
    // LPS origin (-10, -20, 0) in RAS
    assert!((affine[(0, 3)] - 10.0).abs() < 1e-5);
    assert!((affine[(1, 3)] - 20.0).abs() < 1e-5);

    let data = obj.into_volume().into_ndarray::<f32>().unwrap();
    for slice in 0..SLICES {
        assert_eq!(data[[2, 3, slice]], pixel_value(slice, 3, 2) as f32);
    }
}

#[test]
fn directory_without_series_writes_nothing() {
    let temp = tempfile::tempdir().unwrap();
    std::fs::write(temp.path().join("readme.txt"), "no images here").unwrap();
    let output = temp.path().join("out").join("structural.nii.gz");

    let err = converter::convert(temp.path(), &output).unwrap_err();
    assert!(matches!(err, ConvertError::NoSeriesFound(_)));
    assert!(!output.exists());
}

#[test]
fn instance_number_sorting_follows_instance_order() {
    let temp = tempfile::tempdir().unwrap();
    common::write_series(temp.path(), "1.2.3");

    let (series, volume) =
        VolumeLoader::load_from_directory(temp.path(), SortBy::InstanceNumber).unwrap();
    assert_eq!(series.files.len(), SLICES);
    assert_eq!(volume.dim(), (SLICES, ROWS, COLS));
    // instance 1 holds the last position
    assert_eq!(volume.data()[[0, 0, 0]], pixel_value(SLICES - 1, 0, 0) as f32);
    // the slice axis points from the last position back to the first
    let affine = volume.geometry().affine_lps();
    for k in 0..SLICES {
        let z = affine[(2, 3)] + k as f64 * affine[(2, 2)];
        assert!((z - (SLICES - 1 - k) as f64 * SLICE_GAP).abs() < 1e-9);
    }

    let (_, volume) =
        VolumeLoader::load_from_directory(temp.path(), SortBy::ImagePositionPatient).unwrap();
    assert_eq!(volume.data()[[0, 0, 0]], pixel_value(0, 0, 0) as f32);
    assert!((volume.geometry().spacing[2] - SLICE_GAP).abs() < 1e-9);
    let affine = volume.geometry().affine_lps();
    for k in 0..SLICES {
        let z = affine[(2, 3)] + k as f64 * affine[(2, 2)];
        assert!((z - k as f64 * SLICE_GAP).abs() < 1e-9);
    }
}

#[test]
fn lowest_series_uid_is_converted_alone() {
    let temp = tempfile::tempdir().unwrap();
    common::write_series(temp.path(), "1.2.3.9");
    for slice in 0..2 {
        let sop_uid = format!("1.2.3.10.{slice}");
        let obj = common::slice_object("1.2.3.10", &sop_uid, slice, slice as i32 + 1);
        common::write_slice(temp.path(), &format!("LOC-{slice}.dcm"), &sop_uid, obj);
    }
    let output = temp.path().join("structural.nii");

    let report = converter::convert(temp.path(), &output).unwrap();
    // "1.2.3.10" sorts before "1.2.3.9"
    assert_eq!(report.series_uid, "1.2.3.10");
    assert_eq!(report.slice_count, 2);
    assert_eq!(report.shape, (COLS, ROWS, 2));
}

#[test]
fn mixed_orientations_are_rejected() {
    let temp = tempfile::tempdir().unwrap();
    common::write_series(temp.path(), "1.2.4");
    let mut obj = common::slice_object("1.2.4", "1.2.4.2", 2, 2);
    obj.put(DataElement::new(
        tags::IMAGE_ORIENTATION_PATIENT,
        VR::DS,
        dicom_value!(Strs, ["1", "0", "0", "0", "0", "-1"]),
    ));
    common::write_slice(temp.path(), "IM-0002.dcm", "1.2.4.2", obj);

    let err = VolumeLoader::load_from_directory(temp.path(), SortBy::ImagePositionPatient)
        .unwrap_err();
    assert!(matches!(err, VolumeLoaderError::InconsistentOrientation));
}

#[test]
fn missing_position_falls_back_to_instance_number() {
    let temp = tempfile::tempdir().unwrap();
    common::write_series(temp.path(), "1.2.5");
    let mut obj = common::slice_object("1.2.5", "1.2.5.3", 1, 3);
    obj.remove_element(tags::IMAGE_POSITION_PATIENT);
    common::write_slice(temp.path(), "IM-0003.dcm", "1.2.5.3", obj);

    let (_, volume) =
        VolumeLoader::load_from_directory(temp.path(), SortBy::ImagePositionPatient).unwrap();
    for slice in 0..SLICES {
        let expected = pixel_value(SLICES - 1 - slice, 1, 1) as f32;
        assert_eq!(volume.data()[[slice, 1, 1]], expected);
    }
    let geometry = volume.geometry();
    // no gap can be measured, so SliceThickness is used
    assert!((geometry.spacing[2] - 2.0).abs() < 1e-9);
    assert!((geometry.origin[2] - (SLICES - 1) as f64 * SLICE_GAP).abs() < 1e-9);
    assert!((geometry.direction[(2, 2)] + 1.0).abs() < 1e-9);
}

#[test]
fn single_slice_uses_slice_thickness() {
    let temp = tempfile::tempdir().unwrap();
    let mut obj = common::slice_object("1.2.6", "1.2.6.1", 0, 1);
    obj.put(common::string(tags::SLICE_THICKNESS, VR::DS, "3.5"));
    common::write_slice(temp.path(), "IM-0001.dcm", "1.2.6.1", obj);
    let output = temp.path().join("out").join("single.nii.gz");

    let report = converter::convert(temp.path(), &output).unwrap();
    assert_eq!(report.slice_count, 1);
    assert_eq!(report.shape, (COLS, ROWS, 1));

    let obj = ReaderOptions::new().read_file(&output).unwrap();
    let header = obj.header();
    assert_eq!(header.dim[3], 1);
    assert!((header.pixdim[3] - 3.5).abs() < 1e-6);
}
