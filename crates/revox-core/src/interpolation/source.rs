//! Borrowed view of an image's pixel data for sampling.

use crate::image::{Image, ScalarBuffer, ScalarKind};
use crate::spatial::Extent;

/// A read-only view of an image buffer with optional component slicing.
///
/// Interpolators sample through this view; the component window selects
/// which interleaved components they read and produce.
#[derive(Debug, Clone, Copy)]
pub struct SourceView<'a> {
    data: &'a ScalarBuffer,
    extent: Extent,
    total_components: usize,
    component_offset: usize,
    components: usize,
}

impl<'a> SourceView<'a> {
    /// View all components of an image.
    pub fn new(image: &'a Image) -> Self {
        Self::with_components(image, 0, image.num_components())
    }

    /// View a component window `[offset, offset + count)`.
    ///
    /// The window is clipped to the components the image actually has.
    pub fn with_components(image: &'a Image, offset: usize, count: usize) -> Self {
        let total = image.num_components();
        let offset = offset.min(total.saturating_sub(1));
        let count = count.clamp(1, total - offset);
        Self {
            data: image.data(),
            extent: *image.extent(),
            total_components: total,
            component_offset: offset,
            components: count,
        }
    }

    pub fn data(&self) -> &'a ScalarBuffer {
        self.data
    }

    pub fn kind(&self) -> ScalarKind {
        self.data.kind()
    }

    pub fn extent(&self) -> &Extent {
        &self.extent
    }

    pub fn total_components(&self) -> usize {
        self.total_components
    }

    pub fn component_offset(&self) -> usize {
        self.component_offset
    }

    /// Number of components the view samples.
    pub fn components(&self) -> usize {
        self.components
    }

    /// Element strides along x, y and z.
    #[inline]
    pub fn increments(&self) -> [usize; 3] {
        let nx = self.extent.size(0);
        let ny = self.extent.size(1);
        let cx = self.total_components;
        [cx, cx * nx, cx * nx * ny]
    }

    /// Element offset of component 0 of the view at voxel `(i, j, k)`.
    ///
    /// The index must lie inside the extent.
    #[inline]
    pub fn element_offset(&self, i: i32, j: i32, k: i32) -> usize {
        let [ix, iy, iz] = self.increments();
        let x = (i - self.extent.min(0)) as usize;
        let y = (j - self.extent.min(1)) as usize;
        let z = (k - self.extent.min(2)) as usize;
        x * ix + y * iy + z * iz + self.component_offset
    }
}
