//! Spatial description of a volume in patient (LPS) coordinates.
//!
//! DICOM and ITK describe images in LPS space while NIfTI affines map voxels
//! to RAS. Conversions between the two flip the sign of the first two world
//! axes.

use nalgebra::{Matrix3, Matrix4, Rotation3, UnitQuaternion, Vector3};

const DEGENERATE_NORM: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    /// World position of the first voxel
    pub origin: [f64; 3],
    /// Voxel size along (column, row, slice)
    pub spacing: [f64; 3],
    /// Direction cosines; column 0 follows the image rows, column 1 the
    /// image columns, column 2 the slice normal
    pub direction: Matrix3<f64>,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            origin: [0.0; 3],
            spacing: [1.0; 3],
            direction: Matrix3::identity(),
        }
    }
}

impl Geometry {
    pub fn new(origin: [f64; 3], spacing: [f64; 3], direction: Matrix3<f64>) -> Self {
        Self {
            origin,
            spacing,
            direction,
        }
    }

    /// Voxel (column, row, slice) to LPS world transform.
    pub fn affine_lps(&self) -> Matrix4<f64> {
        let scaled = self.direction * Matrix3::from_diagonal(&Vector3::from(self.spacing));
        let mut affine = Matrix4::identity();
        affine.fixed_view_mut::<3, 3>(0, 0).copy_from(&scaled);
        for (i, value) in self.origin.iter().enumerate() {
            affine[(i, 3)] = *value;
        }
        affine
    }

    /// Voxel (column, row, slice) to RAS world transform, as stored in NIfTI.
    pub fn affine_ras(&self) -> Matrix4<f64> {
        lps_ras_flip() * self.affine_lps()
    }

    /// Rebuild a geometry from a NIfTI (RAS) affine.
    pub fn from_ras_affine(affine: &Matrix4<f64>) -> Self {
        let lps = lps_ras_flip() * affine;
        let mut spacing = [0.0; 3];
        let mut columns = [Vector3::zeros(); 3];
        for axis in 0..3 {
            let column: Vector3<f64> = lps.fixed_view::<3, 1>(0, axis).into_owned();
            let norm = column.norm();
            spacing[axis] = norm;
            columns[axis] = if norm > DEGENERATE_NORM {
                column / norm
            } else {
                let mut unit = Vector3::zeros();
                unit[axis] = 1.0;
                unit
            };
        }
        Self {
            origin: [lps[(0, 3)], lps[(1, 3)], lps[(2, 3)]],
            spacing,
            direction: Matrix3::from_columns(&columns),
        }
    }

    /// NIfTI qform parameters `(b, c, d, qfac)` of the RAS rotation.
    pub fn quaternion(&self) -> ([f64; 3], f64) {
        let flip = Matrix3::from_diagonal(&Vector3::new(-1.0, -1.0, 1.0));
        let mut rotation = flip * self.direction;
        let qfac = if rotation.determinant() < 0.0 {
            let mut third = rotation.column_mut(2);
            third.neg_mut();
            -1.0
        } else {
            1.0
        };
        let quaternion =
            UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(rotation));
        let sign = if quaternion.w < 0.0 { -1.0 } else { 1.0 };
        (
            [sign * quaternion.i, sign * quaternion.j, sign * quaternion.k],
            qfac,
        )
    }

    /// Direction cosines flattened row by row.
    pub fn direction_row_major(&self) -> [f64; 9] {
        let mut flat = [0.0; 9];
        for row in 0..3 {
            for col in 0..3 {
                flat[row * 3 + col] = self.direction[(row, col)];
            }
        }
        flat
    }
}

fn lps_ras_flip() -> Matrix4<f64> {
    Matrix4::from_diagonal(&nalgebra::Vector4::new(-1.0, -1.0, 1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oblique() -> Geometry {
        let row = Vector3::new(1.0, 0.0, 0.0);
        let col = Vector3::new(0.0, 0.8, -0.6);
        let normal = row.cross(&col);
        Geometry::new(
            [-120.0, 80.5, 33.0],
            [0.5, 0.75, 2.0],
            Matrix3::from_columns(&[row, col, normal]),
        )
    }

    #[test]
    fn ras_affine_flips_first_two_world_axes() {
        let geometry = Geometry::new([10.0, 20.0, 30.0], [2.0, 3.0, 4.0], Matrix3::identity());
        let ras = geometry.affine_ras();
        assert_eq!(ras[(0, 0)], -2.0);
        assert_eq!(ras[(1, 1)], -3.0);
        assert_eq!(ras[(2, 2)], 4.0);
        assert_eq!(ras[(0, 3)], -10.0);
        assert_eq!(ras[(1, 3)], -20.0);
        assert_eq!(ras[(2, 3)], 30.0);
    }

    #[test]
    fn from_ras_affine_recovers_geometry() {
        let geometry = oblique();
        let recovered = Geometry::from_ras_affine(&geometry.affine_ras());
        for axis in 0..3 {
            assert!((recovered.origin[axis] - geometry.origin[axis]).abs() < 1e-9);
            assert!((recovered.spacing[axis] - geometry.spacing[axis]).abs() < 1e-9);
        }
        assert!((recovered.direction - geometry.direction).norm() < 1e-9);
    }

    #[test]
    fn degenerate_columns_fall_back_to_unit_axes() {
        let mut affine = Matrix4::identity();
        affine[(2, 2)] = 0.0;
        let geometry = Geometry::from_ras_affine(&affine);
        assert_eq!(geometry.spacing[2], 0.0);
        assert_eq!(geometry.direction.column(2).into_owned(), Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn identity_lps_direction_is_half_turn_about_z() {
        let (bcd, qfac) = Geometry::default().quaternion();
        assert_eq!(qfac, 1.0);
        assert!(bcd[0].abs() < 1e-9);
        assert!(bcd[1].abs() < 1e-9);
        assert!((bcd[2].abs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn mirrored_direction_sets_negative_qfac() {
        let direction = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, -1.0));
        let geometry = Geometry::new([0.0; 3], [1.0; 3], direction);
        let (_, qfac) = geometry.quaternion();
        assert_eq!(qfac, -1.0);
    }
}
