//! # Medical imaging coursework library
//!
//! Three independent flows built on the dicom-rs and nifti-rs ecosystems:
//!
//!  - **Conversion**: read every DICOM file of a series from a directory,
//!    stack the slices into a volume with its patient-space geometry and
//!    write it as a (optionally gzipped) NIfTI-1 file.
//!  - **Comparison**: load one DICOM file with a raw pixel decoder and one
//!    NIfTI file with two decoders following different axis conventions,
//!    then render a slice of each with orientation annotations.
//!  - **Metrics**: confusion matrix, ROC curve, classification report and
//!    sample predictions for a two-class COVID / NonCOVID classifier,
//!    written as SVG figures.
//!
//! DICOM headers and pixel data are read in parallel using rayon. Files
//! that are not DICOM are skipped during directory scans. The DICOM files
//! of a directory are assumed to have the following attributes:
//!   - Single-frame grayscale images (the first frame is used otherwise)
//!   - Parallel slices sharing one orientation and size
//!
//! # Examples
//!
//! ## Converting a DICOM series to NIfTI
//!
//! ```no_run
//! # use medimg_course::converter;
//! let report = converter::convert("dicoms", "structural.nii.gz")
//!     .expect("should have converted the series");
//! println!("{} slices, shape {:?}", report.slice_count, report.shape);
//! ```
//!
//! ## Comparing decoder orientations
//!
//! ```no_run
//! # use medimg_course::comparator::{self, CompareOptions};
//! # use std::path::{Path, PathBuf};
//! let options = CompareOptions {
//!     slice_index: None,
//!     render_dir: Some(PathBuf::from("figures")),
//! };
//! let results = comparator::load_and_compare(
//!     Path::new("dicoms/IM-0001.dcm"),
//!     Some(Path::new("structural.nii.gz")),
//!     &options,
//! );
//! for line in comparator::shape_summary(&results).unwrap_or_default() {
//!     println!("{line}");
//! }
//! ```

pub mod comparator;
pub mod converter;
pub mod decoders;
mod dicom_tags;
pub mod enums;
pub mod geometry;
pub mod metrics;
pub mod plots;
pub mod render;
pub mod volume;
pub mod volume_loader;

pub use comparator::{CompareOptions, LoadResults, load_and_compare};
pub use converter::{ConversionReport, ConvertError, convert};
pub use decoders::{DecodeError, LoadResult, SliceDecoder};
pub use enums::{Class, DecoderKind, SortBy};
pub use geometry::Geometry;
pub use volume::Volume;
pub use volume_loader::{VolumeLoader, VolumeLoaderError};
