//! The point-transform trait.

use crate::mtime::ModifiedTime;
use crate::spatial::Matrix4d;

/// A world-space point mapping, possibly nonlinear.
///
/// Transforms that can be written as a 4x4 matrix return it from
/// [`as_matrix`](PointTransform::as_matrix); those fold into the engine's
/// combined index matrix. Nonlinear transforms return `None` and are applied
/// per voxel instead.
pub trait PointTransform: Send + Sync {
    /// Map a point forward.
    fn forward(&self, p: [f64; 3]) -> [f64; 3];

    /// Map a point through the inverse transform.
    fn inverse(&self, p: [f64; 3]) -> [f64; 3];

    /// The homogeneous 4x4 form, when one exists.
    fn as_matrix(&self) -> Option<Matrix4d> {
        None
    }

    /// When the transform's parameters last changed.
    fn modified_time(&self) -> ModifiedTime {
        ModifiedTime::default()
    }
}
