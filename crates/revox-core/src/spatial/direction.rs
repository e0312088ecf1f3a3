//! Direction type for representing image orientation.
//!
//! Direction matrices represent orientation of image axes in physical space.

use super::{Matrix3d, Vector3d};

/// Direction matrix representing image orientation.
///
/// Column i is the direction of the i-th image axis in physical space.
/// This is a thin wrapper around nalgebra's matrix to provide domain-specific
/// functionality while keeping all nalgebra operations available.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Direction3(pub Matrix3d);

impl Direction3 {
    /// Create an identity direction matrix (no rotation).
    pub fn identity() -> Self {
        Self(Matrix3d::identity())
    }

    /// Build from three rows, matching the flattened row-major setter layout.
    pub fn from_rows(r0: [f64; 3], r1: [f64; 3], r2: [f64; 3]) -> Self {
        Self(Matrix3d::new(
            r0[0], r0[1], r0[2], r1[0], r1[1], r1[2], r2[0], r2[1], r2[2],
        ))
    }

    /// Check whether the matrix is orthonormal.
    pub fn is_orthonormal(&self) -> bool {
        let product = self.0 * self.0.transpose();
        let identity = Matrix3d::identity();
        (0..3).all(|i| (0..3).all(|j| (product[(i, j)] - identity[(i, j)]).abs() < 1e-6))
    }

    /// Try to compute the inverse of the direction matrix.
    pub fn try_inverse(&self) -> Option<Self> {
        self.0.try_inverse().map(Self)
    }

    /// Apply the direction to a vector.
    pub fn apply(&self, v: [f64; 3]) -> [f64; 3] {
        let out = self.0 * Vector3d::new(v[0], v[1], v[2]);
        [out[0], out[1], out[2]]
    }

    /// Get the inner nalgebra matrix.
    pub fn inner(&self) -> &Matrix3d {
        &self.0
    }
}

impl Default for Direction3 {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::ops::Index<(usize, usize)> for Direction3 {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        &self.0[index]
    }
}

impl std::ops::IndexMut<(usize, usize)> for Direction3 {
    fn index_mut(&mut self, index: (usize, usize)) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl std::ops::Mul for Direction3 {
    type Output = Self;

    fn mul(self, other: Self) -> Self::Output {
        Self(self.0 * other.0)
    }
}
