//! The three independent decoders compared side by side.
//!
//! Each decoder reports the array the way its own convention lays it out and
//! a metadata record with its own keys. Nothing is normalized across them.

use crate::{
    dicom_tags::{self, DicomFile},
    enums::DecoderKind,
    geometry::Geometry,
};

use dicom::{
    object::open_file,
    pixeldata::{ConvertOptions, ModalityLutOption, PixelDecoder, VoiLutOption},
};
use dicom_dictionary_std::tags;
use nalgebra::Matrix4;
use ndarray::{Array4, ArrayD, Axis};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions, error::NiftiError};
use std::{collections::BTreeMap, path::Path};
use thiserror::Error;

/// Shown for tags a file does not carry.
pub const NOT_AVAILABLE: &str = "N/A";
/// Element type of every decoded array.
pub const ARRAY_DTYPE: &str = "float64";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),

    #[error("Pixel data error: {0}")]
    PixelData(#[from] dicom::pixeldata::Error),

    #[error("NIfTI error: {0}")]
    Nifti(#[from] NiftiError),

    #[error("Invalid NIfTI header: {0}")]
    InvalidHeader(String),
}

/// Metadata reported by the raw DICOM decoder. Absent tags stay `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct DicomMetadata {
    pub shape: Vec<usize>,
    /// Voxel type as stored in the file
    pub stored_dtype: String,
    pub patient_position: Option<String>,
    pub image_orientation: Option<Vec<f64>>,
    pub pixel_spacing: Option<Vec<f64>>,
    pub slice_thickness: Option<f64>,
}

/// Metadata reported by the affine-oriented NIfTI decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct NiftiMetadata {
    pub shape: Vec<usize>,
    /// Voxel type as stored in the file
    pub stored_dtype: String,
    pub affine: Matrix4<f64>,
    pub header: BTreeMap<String, String>,
}

/// Metadata reported by the geometry-oriented (ITK style) NIfTI decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct ItkMetadata {
    pub shape: Vec<usize>,
    /// Voxel type as stored in the file
    pub stored_dtype: String,
    pub origin: [f64; 3],
    pub spacing: [f64; 3],
    /// Direction cosines, row-major
    pub direction: [f64; 9],
}

#[derive(Debug, Clone, PartialEq)]
pub enum Metadata {
    Dicom(DicomMetadata),
    Nifti(NiftiMetadata),
    Itk(ItkMetadata),
}

impl Metadata {
    pub fn shape(&self) -> &[usize] {
        match self {
            Metadata::Dicom(m) => &m.shape,
            Metadata::Nifti(m) => &m.shape,
            Metadata::Itk(m) => &m.shape,
        }
    }

    /// Element type of the decoded array.
    pub fn dtype(&self) -> &str {
        ARRAY_DTYPE
    }

    pub fn stored_dtype(&self) -> &str {
        match self {
            Metadata::Dicom(m) => &m.stored_dtype,
            Metadata::Nifti(m) => &m.stored_dtype,
            Metadata::Itk(m) => &m.stored_dtype,
        }
    }

    /// `(key, value)` lines in the order they are reported.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = vec![
            ("shape", format!("{:?}", self.shape())),
            ("dtype", self.dtype().to_string()),
            ("stored dtype", self.stored_dtype().to_string()),
        ];
        match self {
            Metadata::Dicom(m) => {
                entries.push(("PatientPosition", or_na(m.patient_position.clone())));
                entries.push(("ImageOrientation", or_na(debug_list(&m.image_orientation))));
                entries.push(("PixelSpacing", or_na(debug_list(&m.pixel_spacing))));
                entries.push((
                    "SliceThickness",
                    or_na(m.slice_thickness.map(|t| t.to_string())),
                ));
            }
            Metadata::Nifti(m) => {
                entries.push(("affine", format_affine(&m.affine)));
            }
            Metadata::Itk(m) => {
                entries.push(("origin", format!("{:?}", m.origin)));
                entries.push(("spacing", format!("{:?}", m.spacing)));
                entries.push(("direction", format!("{:?}", m.direction)));
            }
        }
        entries
    }
}

fn or_na(value: Option<String>) -> String {
    value.unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn debug_list(values: &Option<Vec<f64>>) -> Option<String> {
    values.as_ref().map(|v| format!("{v:?}"))
}

fn format_affine(affine: &Matrix4<f64>) -> String {
    affine
        .row_iter()
        .map(|row| {
            let values: Vec<_> = row.iter().map(|v| format!("{v:>10.4}")).collect();
            format!("[{}]", values.join(" "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// What one decoder produced.
#[derive(Debug, Clone)]
pub struct LoadResult {
    pub array: ArrayD<f64>,
    pub metadata: Metadata,
    /// Plane picked for display, set for 3D arrays only
    pub slice_index: Option<usize>,
}

impl LoadResult {
    fn new(array: ArrayD<f64>, metadata: Metadata) -> Self {
        Self {
            array,
            metadata,
            slice_index: None,
        }
    }
}

pub trait SliceDecoder {
    fn kind(&self) -> DecoderKind;

    fn load(&self, path: &Path) -> Result<LoadResult, DecodeError>;

    /// Axis stacking the 2D planes of a 3D result, in this decoder's layout.
    fn stacking_axis(&self) -> Option<usize>;

    /// Direction of increasing column index, then of increasing row index.
    fn axis_labels(&self) -> (&'static str, &'static str);
}

/// Single DICOM file, stored pixel values without any LUT applied.
///
/// Shape is (rows, columns) for a single grayscale frame, with a leading
/// frame axis for multi-frame objects and a trailing sample axis for color.
pub struct RawDicomDecoder;

impl RawDicomDecoder {
    fn pixel_array(frames: Array4<f64>) -> ArrayD<f64> {
        let mut array = frames.into_dyn();
        if array.shape()[3] == 1 {
            array = array.index_axis_move(Axis(3), 0);
        }
        if array.shape()[0] == 1 {
            array = array.index_axis_move(Axis(0), 0);
        }
        array
    }

    fn stored_dtype(obj: &DicomFile) -> String {
        let bits = dicom_tags::int(obj, tags::BITS_ALLOCATED);
        let signed = dicom_tags::int(obj, tags::PIXEL_REPRESENTATION) == Some(1);
        match (bits, signed) {
            (Some(b @ (8 | 16 | 32 | 64)), true) => format!("int{b}"),
            (Some(b @ (8 | 16 | 32 | 64)), false) => format!("uint{b}"),
            (Some(1), _) => "bool".to_string(),
            (Some(b), _) => format!("{b}-bit"),
            (None, _) => "unknown".to_string(),
        }
    }

    fn metadata(obj: &DicomFile, shape: Vec<usize>) -> DicomMetadata {
        DicomMetadata {
            shape,
            stored_dtype: Self::stored_dtype(obj),
            patient_position: dicom_tags::string(obj, tags::PATIENT_POSITION),
            image_orientation: dicom_tags::floats(obj, tags::IMAGE_ORIENTATION_PATIENT),
            pixel_spacing: dicom_tags::floats(obj, tags::PIXEL_SPACING),
            slice_thickness: dicom_tags::float(obj, tags::SLICE_THICKNESS),
        }
    }
}

impl SliceDecoder for RawDicomDecoder {
    fn kind(&self) -> DecoderKind {
        DecoderKind::Dicom
    }

    fn load(&self, path: &Path) -> Result<LoadResult, DecodeError> {
        let obj = open_file(path)?;
        let options = ConvertOptions::new()
            .with_modality_lut(ModalityLutOption::None)
            .with_voi_lut(VoiLutOption::Identity);
        let frames = obj
            .decode_pixel_data()?
            .to_ndarray_with_options::<f64>(&options)?;
        let array = Self::pixel_array(frames);
        let metadata = Self::metadata(&obj, array.shape().to_vec());
        Ok(LoadResult::new(array, Metadata::Dicom(metadata)))
    }

    fn stacking_axis(&self) -> Option<usize> {
        None
    }

    fn axis_labels(&self) -> (&'static str, &'static str) {
        ("Column (Width)", "Row (Height)")
    }
}

fn nifti_dtype(header: &NiftiHeader) -> String {
    header
        .data_type()
        .map(|t| format!("{t:?}").to_lowercase())
        .unwrap_or_else(|_| format!("datatype {}", header.datatype))
}

/// Largest quaternion norm excess tolerated for the qform, matching the
/// reader's own rounding allowance.
const QUATERNION_TOLERANCE: f64 = f32::EPSILON as f64 * 3.0;

/// The voxel-to-world affine the header selects (sform, then qform, then
/// shape and zooms).
///
/// Inputs the nifti crate would abort on are checked first: a qfac of 0 is
/// read as 1, while any other qfac besides -1 and 1, negative spacings or a
/// quaternion with norm above 1 are errors. Headers with fewer than three
/// dimensions get unit extents on the missing axes.
fn checked_affine(header: &NiftiHeader) -> Result<Matrix4<f64>, DecodeError> {
    let mut header = header.clone();
    let ndim = header.dimensionality()?;
    if ndim < 3 {
        for axis in ndim + 1..=3 {
            header.dim[axis] = 1;
            header.pixdim[axis] = 1.0;
        }
        header.dim[0] = 3;
    }

    if header.sform_code == 0 && header.qform_code != 0 {
        if header.pixdim[0] == 0.0 {
            header.pixdim[0] = 1.0;
        }
        let qfac = header.pixdim[0];
        if (qfac.abs() - 1.0).abs() >= 1e-11 {
            return Err(DecodeError::InvalidHeader(format!(
                "qfac (pixdim[0]) must be -1 or 1, found {qfac}"
            )));
        }
        if let Some(p) = header.pixdim[1..4].iter().find(|p| **p < 0.0) {
            return Err(DecodeError::InvalidHeader(format!(
                "negative voxel spacing {p} in pixdim {:?}",
                &header.pixdim[1..4]
            )));
        }
        let [b, c, d] = [header.quatern_b, header.quatern_c, header.quatern_d].map(f64::from);
        let norm = b * b + c * c + d * d;
        if !norm.is_finite() || norm > 1.0 + QUATERNION_TOLERANCE {
            return Err(DecodeError::InvalidHeader(format!(
                "qform quaternion ({b}, {c}, {d}) has norm above 1"
            )));
        }
    }

    Ok(header.affine::<f64>())
}

/// NIfTI file as stored: axes (x, y, z[, t]) and the voxel-to-world affine.
pub struct AffineNiftiDecoder;

impl AffineNiftiDecoder {
    fn header_dict(header: &NiftiHeader) -> BTreeMap<String, String> {
        let text = |bytes: &[u8]| {
            String::from_utf8_lossy(bytes)
                .trim_end_matches('\0')
                .to_string()
        };
        [
            ("sizeof_hdr", header.sizeof_hdr.to_string()),
            ("dim", format!("{:?}", header.dim)),
            ("datatype", header.datatype.to_string()),
            ("bitpix", header.bitpix.to_string()),
            ("pixdim", format!("{:?}", header.pixdim)),
            ("vox_offset", header.vox_offset.to_string()),
            ("scl_slope", header.scl_slope.to_string()),
            ("scl_inter", header.scl_inter.to_string()),
            ("xyzt_units", header.xyzt_units.to_string()),
            ("descrip", text(&header.descrip[..])),
            ("qform_code", header.qform_code.to_string()),
            ("sform_code", header.sform_code.to_string()),
            ("quatern_b", header.quatern_b.to_string()),
            ("quatern_c", header.quatern_c.to_string()),
            ("quatern_d", header.quatern_d.to_string()),
            ("qoffset_x", header.quatern_x.to_string()),
            ("qoffset_y", header.quatern_y.to_string()),
            ("qoffset_z", header.quatern_z.to_string()),
            ("srow_x", format!("{:?}", header.srow_x)),
            ("srow_y", format!("{:?}", header.srow_y)),
            ("srow_z", format!("{:?}", header.srow_z)),
            ("magic", text(&header.magic[..])),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
    }
}

impl SliceDecoder for AffineNiftiDecoder {
    fn kind(&self) -> DecoderKind {
        DecoderKind::Nifti
    }

    fn load(&self, path: &Path) -> Result<LoadResult, DecodeError> {
        let obj = ReaderOptions::new().read_file(path)?;
        let header = obj.header();
        let affine = checked_affine(header)?;
        let stored_dtype = nifti_dtype(header);
        let header = Self::header_dict(header);
        let array = obj.into_volume().into_ndarray::<f64>()?;

        let metadata = NiftiMetadata {
            shape: array.shape().to_vec(),
            stored_dtype,
            affine,
            header,
        };
        Ok(LoadResult::new(array, Metadata::Nifti(metadata)))
    }

    fn stacking_axis(&self) -> Option<usize> {
        Some(2)
    }

    fn axis_labels(&self) -> (&'static str, &'static str) {
        ("R -> L", "P -> A")
    }
}

/// NIfTI file read the ITK way: axes reversed to (z, y, x), geometry as LPS
/// origin, spacing and direction cosines.
pub struct ItkNiftiDecoder;

impl SliceDecoder for ItkNiftiDecoder {
    fn kind(&self) -> DecoderKind {
        DecoderKind::Itk
    }

    fn load(&self, path: &Path) -> Result<LoadResult, DecodeError> {
        let obj = ReaderOptions::new().read_file(path)?;
        let geometry = Geometry::from_ras_affine(&checked_affine(obj.header())?);
        let stored_dtype = nifti_dtype(obj.header());
        let array = obj
            .into_volume()
            .into_ndarray::<f64>()?
            .reversed_axes()
            .as_standard_layout()
            .into_owned();

        let metadata = ItkMetadata {
            shape: array.shape().to_vec(),
            stored_dtype,
            origin: geometry.origin,
            spacing: geometry.spacing,
            direction: geometry.direction_row_major(),
        };
        Ok(LoadResult::new(array, Metadata::Itk(metadata)))
    }

    fn stacking_axis(&self) -> Option<usize> {
        Some(0)
    }

    fn axis_labels(&self) -> (&'static str, &'static str) {
        ("Column", "Row")
    }
}
