//! The image container: geometry metadata plus a typed pixel buffer.

use super::buffer::ScalarBuffer;
use super::scalar::{Scalar, ScalarKind};
use crate::error::{CoreError, Result};
use crate::spatial::{Direction3, Extent, Vector3d};

/// Geometry of a voxel grid: extent, spacing, origin and direction cosines.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    pub extent: Extent,
    pub spacing: [f64; 3],
    pub origin: [f64; 3],
    pub direction: Direction3,
}

impl ImageInfo {
    /// Unit spacing, zero origin, identity direction.
    pub fn new(extent: Extent) -> Self {
        Self {
            extent,
            spacing: [1.0; 3],
            origin: [0.0; 3],
            direction: Direction3::identity(),
        }
    }

    /// Map a continuous voxel index to world coordinates.
    ///
    /// `world = origin + direction * (index * spacing)`
    pub fn index_to_world(&self, index: [f64; 3]) -> [f64; 3] {
        let scaled = Vector3d::new(
            index[0] * self.spacing[0],
            index[1] * self.spacing[1],
            index[2] * self.spacing[2],
        );
        let rotated = self.direction.inner() * scaled;
        [
            rotated[0] + self.origin[0],
            rotated[1] + self.origin[1],
            rotated[2] + self.origin[2],
        ]
    }

    /// Map world coordinates back to a continuous voxel index.
    ///
    /// `None` when the direction matrix cannot be inverted.
    pub fn world_to_index(&self, world: [f64; 3]) -> Option<[f64; 3]> {
        let inv = self.direction.try_inverse()?;
        let shifted = Vector3d::new(
            world[0] - self.origin[0],
            world[1] - self.origin[1],
            world[2] - self.origin[2],
        );
        let rotated = inv.inner() * shifted;
        Some([
            rotated[0] / self.spacing[0],
            rotated[1] / self.spacing[1],
            rotated[2] / self.spacing[2],
        ])
    }
}

/// A 3D scalar image: geometry plus an interleaved pixel buffer.
///
/// Storage is X-fastest: the element index of component `c` of voxel
/// `(i, j, k)` is `((k - z0) * ny + (j - y0)) * nx + (i - x0)` voxels times
/// the component count, plus `c`.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    info: ImageInfo,
    components: usize,
    data: ScalarBuffer,
}

impl Image {
    /// Allocate a zero-filled image.
    pub fn try_new(info: ImageInfo, kind: ScalarKind, components: usize) -> Result<Self> {
        if components == 0 {
            return Err(CoreError::invalid_argument("component count must be >= 1"));
        }
        let len = info.extent.num_voxels() * components;
        let data = ScalarBuffer::try_new(kind, len)?;
        Ok(Self {
            info,
            components,
            data,
        })
    }

    /// Wrap an existing buffer; its length must match the extent.
    pub fn from_vec<T: Scalar>(info: ImageInfo, components: usize, data: Vec<T>) -> Result<Self> {
        let expected = info.extent.num_voxels() * components;
        if data.len() != expected {
            return Err(CoreError::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            info,
            components,
            data: ScalarBuffer::from(data),
        })
    }

    pub fn info(&self) -> &ImageInfo {
        &self.info
    }

    pub fn extent(&self) -> &Extent {
        &self.info.extent
    }

    pub fn num_components(&self) -> usize {
        self.components
    }

    pub fn scalar_kind(&self) -> ScalarKind {
        self.data.kind()
    }

    pub fn data(&self) -> &ScalarBuffer {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut ScalarBuffer {
        &mut self.data
    }

    /// Element index of component 0 of voxel `(i, j, k)`.
    pub fn element_index(&self, i: i32, j: i32, k: i32) -> usize {
        let ext = &self.info.extent;
        let nx = ext.size(0);
        let ny = ext.size(1);
        let x = (i - ext.min(0)) as usize;
        let y = (j - ext.min(1)) as usize;
        let z = (k - ext.min(2)) as usize;
        ((z * ny + y) * nx + x) * self.components
    }

    /// Read one component of one voxel as a double; `None` outside the extent.
    pub fn value_at(&self, i: i32, j: i32, k: i32, c: usize) -> Option<f64> {
        if !self.info.extent.contains(i, j, k) || c >= self.components {
            return None;
        }
        let idx = self.element_index(i, j, k) + c;
        let value = crate::dispatch_scalar!(self.data.kind(), T => {
            self.data.as_slice::<T>().map(|s| s[idx].to_f64())
        });
        value
    }
}
