use crate::geometry::Geometry;

use ndarray::{Array3, ArrayView3};

/// A reconstructed DICOM series.
///
/// Voxels are stored as (slice, row, column) in the order the slices were
/// stacked. The volume is never modified after loading.
#[derive(Debug, Clone)]
pub struct Volume {
    data: Array3<f32>,
    geometry: Geometry,
}

impl Volume {
    pub fn new(data: Array3<f32>, geometry: Geometry) -> Self {
        Self { data, geometry }
    }

    /// Get the dimensions of the volume (depth, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// View of the voxels indexed (column, row, slice), the axis order of a
    /// NIfTI file.
    pub fn nifti_view(&self) -> ArrayView3<'_, f32> {
        self.data.view().permuted_axes([2, 1, 0])
    }
}
