//! Homogeneous 4x4 matrix transform.

use super::trait_::PointTransform;
use crate::error::{CoreError, Result};
use crate::mtime::ModifiedTime;
use crate::spatial::{Matrix4d, Vector4d};

/// A transform defined by an invertible homogeneous matrix.
#[derive(Debug, Clone)]
pub struct MatrixTransform {
    matrix: Matrix4d,
    inverse: Matrix4d,
    modified: ModifiedTime,
}

fn multiply_point(m: &Matrix4d, p: [f64; 3]) -> [f64; 3] {
    let out = m * Vector4d::new(p[0], p[1], p[2], 1.0);
    let f = 1.0 / out[3];
    [out[0] * f, out[1] * f, out[2] * f]
}

impl MatrixTransform {
    /// Build from a matrix; fails when it cannot be inverted.
    pub fn try_new(matrix: Matrix4d) -> Result<Self> {
        let inverse = matrix
            .try_inverse()
            .ok_or_else(|| CoreError::singular_matrix("matrix transform is not invertible"))?;
        Ok(Self {
            matrix,
            inverse,
            modified: ModifiedTime::now(),
        })
    }

    pub fn matrix(&self) -> &Matrix4d {
        &self.matrix
    }
}

impl PointTransform for MatrixTransform {
    fn forward(&self, p: [f64; 3]) -> [f64; 3] {
        multiply_point(&self.matrix, p)
    }

    fn inverse(&self, p: [f64; 3]) -> [f64; 3] {
        multiply_point(&self.inverse, p)
    }

    fn as_matrix(&self) -> Option<Matrix4d> {
        Some(self.matrix)
    }

    fn modified_time(&self) -> ModifiedTime {
        self.modified
    }
}
