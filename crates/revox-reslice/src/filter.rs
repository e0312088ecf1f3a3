//! The reslice filter and its parameter surface.

use revox_core::image::{ImageInfo, ScalarKind};
use revox_core::interpolation::{Interpolator, InterpolationMode};
use revox_core::mtime::ModifiedTime;
use revox_core::spatial::{Direction3, Extent, Matrix4d};
use revox_core::transform::PointTransform;

use crate::driver::SplitMode;
use crate::error::{ResliceError, Result};

/// How a slab of parallel samples is folded into one output voxel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SlabMode {
    Min,
    Max,
    #[default]
    Mean,
    Sum,
}

impl std::fmt::Display for SlabMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SlabMode::Min => "Min",
            SlabMode::Max => "Max",
            SlabMode::Mean => "Mean",
            SlabMode::Sum => "Sum",
        };
        write!(f, "{name}")
    }
}

/// Resamples a 3D scalar image onto a new voxel grid.
///
/// The grid's pose, spacing, direction cosines, extent and dimensionality may
/// all differ from the input's. Every parameter is optional; with the
/// defaults the filter reproduces the input geometry and copies voxels with
/// nearest-neighbor sampling.
pub struct ImageReslice {
    pub(crate) reslice_axes: Option<Matrix4d>,
    pub(crate) reslice_transform: Option<Box<dyn PointTransform>>,
    pub(crate) interpolator: Option<Box<dyn Interpolator>>,
    pub(crate) information_input: Option<ImageInfo>,

    pub(crate) transform_input_sampling: bool,
    pub(crate) auto_crop_output: bool,
    pub(crate) output_dimensionality: i32,

    pub(crate) compute_output_spacing: bool,
    pub(crate) output_spacing: [f64; 3],
    pub(crate) pass_direction_to_output: bool,
    pub(crate) output_direction: Direction3,
    pub(crate) compute_output_origin: bool,
    pub(crate) output_origin: [f64; 3],
    pub(crate) compute_output_extent: bool,
    pub(crate) output_extent: Extent,
    pub(crate) output_scalar_kind: Option<ScalarKind>,

    pub(crate) interpolation_mode: InterpolationMode,
    pub(crate) wrap: bool,
    pub(crate) mirror: bool,
    pub(crate) border: bool,
    pub(crate) border_thickness: f64,

    pub(crate) slab_mode: SlabMode,
    pub(crate) slab_number_of_slices: i32,
    pub(crate) slab_trapezoid_integration: bool,
    pub(crate) slab_slice_spacing_fraction: f64,

    pub(crate) optimization: bool,
    pub(crate) scalar_shift: f64,
    pub(crate) scalar_scale: f64,
    pub(crate) background_color: [f64; 4],
    pub(crate) generate_stencil_output: bool,
    pub(crate) split_mode: SplitMode,

    pub(crate) modified: ModifiedTime,
}

impl Default for ImageReslice {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageReslice {
    pub fn new() -> Self {
        Self {
            reslice_axes: None,
            reslice_transform: None,
            interpolator: None,
            information_input: None,
            transform_input_sampling: true,
            auto_crop_output: false,
            output_dimensionality: 3,
            compute_output_spacing: true,
            output_spacing: [1.0; 3],
            pass_direction_to_output: true,
            output_direction: Direction3::identity(),
            compute_output_origin: true,
            output_origin: [0.0; 3],
            compute_output_extent: true,
            output_extent: Extent([0; 6]),
            output_scalar_kind: None,
            interpolation_mode: InterpolationMode::Nearest,
            wrap: false,
            mirror: false,
            border: true,
            border_thickness: 0.5,
            slab_mode: SlabMode::Mean,
            slab_number_of_slices: 1,
            slab_trapezoid_integration: false,
            slab_slice_spacing_fraction: 1.0,
            optimization: true,
            scalar_shift: 0.0,
            scalar_scale: 1.0,
            background_color: [0.0; 4],
            generate_stencil_output: false,
            split_mode: SplitMode::Slab,
            modified: ModifiedTime::now(),
        }
    }

    fn touch(&mut self) {
        self.modified = ModifiedTime::now();
    }

    /// The filter's effective modification time: the latest of its own and
    /// those of the attached reslice transform and interpolator.
    pub fn modified_time(&self) -> ModifiedTime {
        let mut t = self.modified;
        if let Some(transform) = &self.reslice_transform {
            t = t.max(transform.modified_time());
        }
        if let Some(interpolator) = &self.interpolator {
            t = t.max(interpolator.modified_time());
        }
        t
    }

    /// Rigid placement of the output frame relative to the input.
    pub fn set_reslice_axes(&mut self, axes: Matrix4d) {
        self.reslice_axes = Some(axes);
        self.touch();
    }

    pub fn clear_reslice_axes(&mut self) {
        self.reslice_axes = None;
        self.touch();
    }

    pub fn reslice_axes(&self) -> Option<&Matrix4d> {
        self.reslice_axes.as_ref()
    }

    /// Convenience setter for the rotation block of the reslice axes.
    ///
    /// The three arguments are the direction cosines of the output x, y and
    /// z axes; they land in the corresponding matrix columns.
    pub fn set_reslice_axes_direction_cosines(
        &mut self,
        x: [f64; 3],
        y: [f64; 3],
        z: [f64; 3],
    ) {
        let axes = self.reslice_axes.get_or_insert_with(Matrix4d::identity);
        for i in 0..3 {
            axes[(i, 0)] = x[i];
            axes[(i, 1)] = y[i];
            axes[(i, 2)] = z[i];
            axes[(3, i)] = 0.0;
        }
        self.touch();
    }

    /// Convenience setter for the translation column of the reslice axes.
    pub fn set_reslice_axes_origin(&mut self, origin: [f64; 3]) {
        let axes = self.reslice_axes.get_or_insert_with(Matrix4d::identity);
        for i in 0..3 {
            axes[(i, 3)] = origin[i];
        }
        axes[(3, 3)] = 1.0;
        self.touch();
    }

    /// An arbitrary, possibly nonlinear warp applied after the reslice axes.
    pub fn set_reslice_transform(&mut self, transform: Box<dyn PointTransform>) {
        self.reslice_transform = Some(transform);
        self.touch();
    }

    pub fn clear_reslice_transform(&mut self) {
        self.reslice_transform = None;
        self.touch();
    }

    /// Replace the interpolator; when none is set, one is built from
    /// [`set_interpolation_mode`](Self::set_interpolation_mode).
    pub fn set_interpolator(&mut self, interpolator: Box<dyn Interpolator>) {
        self.interpolator = Some(interpolator);
        self.touch();
    }

    /// Borrow output geometry defaults from this image instead of the input.
    pub fn set_information_input(&mut self, info: ImageInfo) {
        self.information_input = Some(info);
        self.touch();
    }

    pub fn clear_information_input(&mut self) {
        self.information_input = None;
        self.touch();
    }

    /// Whether geometry derivation accounts for the reslice axes rotation.
    pub fn set_transform_input_sampling(&mut self, on: bool) {
        self.transform_input_sampling = on;
        self.touch();
    }

    /// Fit the output extent to the bounding box of the mapped input.
    pub fn set_auto_crop_output(&mut self, on: bool) {
        self.auto_crop_output = on;
        self.touch();
    }

    /// Collapse output axes at and above `dim` (1, 2 or 3).
    pub fn set_output_dimensionality(&mut self, dim: i32) -> Result<()> {
        if !(1..=3).contains(&dim) {
            return Err(ResliceError::invalid_parameter(format!(
                "output dimensionality must be 1, 2 or 3, got {dim}"
            )));
        }
        self.output_dimensionality = dim;
        self.touch();
        Ok(())
    }

    pub fn set_output_spacing(&mut self, spacing: [f64; 3]) {
        self.output_spacing = spacing;
        self.compute_output_spacing = false;
        self.touch();
    }

    pub fn set_output_spacing_to_default(&mut self) {
        self.output_spacing = [1.0; 3];
        self.compute_output_spacing = true;
        self.touch();
    }

    pub fn set_output_direction(&mut self, direction: Direction3) {
        self.output_direction = direction;
        self.pass_direction_to_output = false;
        self.touch();
    }

    pub fn set_output_direction_to_default(&mut self) {
        self.output_direction = Direction3::identity();
        self.pass_direction_to_output = true;
        self.touch();
    }

    pub fn set_output_origin(&mut self, origin: [f64; 3]) {
        self.output_origin = origin;
        self.compute_output_origin = false;
        self.touch();
    }

    pub fn set_output_origin_to_default(&mut self) {
        self.output_origin = [0.0; 3];
        self.compute_output_origin = true;
        self.touch();
    }

    pub fn set_output_extent(&mut self, extent: Extent) {
        self.output_extent = extent;
        self.compute_output_extent = false;
        self.touch();
    }

    pub fn set_output_extent_to_default(&mut self) {
        self.output_extent = Extent([0; 6]);
        self.compute_output_extent = true;
        self.touch();
    }

    /// Output scalar kind; `None` keeps the input kind.
    pub fn set_output_scalar_kind(&mut self, kind: Option<ScalarKind>) {
        self.output_scalar_kind = kind;
        self.touch();
    }

    /// Kernel selection used when no explicit interpolator is supplied.
    pub fn set_interpolation_mode(&mut self, mode: InterpolationMode) {
        self.interpolation_mode = mode;
        self.touch();
    }

    /// Sample the input periodically instead of clamping at the edges.
    pub fn set_wrap(&mut self, on: bool) {
        self.wrap = on;
        self.touch();
    }

    /// Sample the input mirrored at the edges instead of clamping.
    pub fn set_mirror(&mut self, on: bool) {
        self.mirror = on;
        self.touch();
    }

    /// Whether the sampler still reads within `border_thickness` of the
    /// strict input bounds.
    pub fn set_border(&mut self, on: bool) {
        self.border = on;
        self.touch();
    }

    pub fn set_border_thickness(&mut self, thickness: f64) -> Result<()> {
        if !(thickness >= 0.0) {
            return Err(ResliceError::invalid_parameter(format!(
                "border thickness must be >= 0, got {thickness}"
            )));
        }
        self.border_thickness = thickness;
        self.touch();
        Ok(())
    }

    pub fn set_slab_mode(&mut self, mode: SlabMode) {
        self.slab_mode = mode;
        self.touch();
    }

    /// Number of parallel samples composited into each output voxel.
    pub fn set_slab_number_of_slices(&mut self, n: i32) -> Result<()> {
        if n < 1 {
            return Err(ResliceError::invalid_parameter(format!(
                "slab slice count must be >= 1, got {n}"
            )));
        }
        self.slab_number_of_slices = n;
        self.touch();
        Ok(())
    }

    /// Half-weight the first and last slab sample.
    pub fn set_slab_trapezoid_integration(&mut self, on: bool) {
        self.slab_trapezoid_integration = on;
        self.touch();
    }

    /// Inter-sample spacing as a fraction of the output z spacing, in (0, 1].
    pub fn set_slab_slice_spacing_fraction(&mut self, fraction: f64) -> Result<()> {
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(ResliceError::invalid_parameter(format!(
                "slab slice spacing fraction must be in (0, 1], got {fraction}"
            )));
        }
        self.slab_slice_spacing_fraction = fraction;
        self.touch();
        Ok(())
    }

    /// Enables the permute fast path and the nearest-neighbor downgrade.
    pub fn set_optimization(&mut self, on: bool) {
        self.optimization = on;
        self.touch();
    }

    /// Post-interpolation rescale: `(value + shift) * scale`.
    pub fn set_scalar_shift(&mut self, shift: f64) {
        self.scalar_shift = shift;
        self.touch();
    }

    pub fn set_scalar_scale(&mut self, scale: f64) {
        self.scalar_scale = scale;
        self.touch();
    }

    /// Written to out-of-bounds and stencil-masked voxels.
    pub fn set_background_color(&mut self, color: [f64; 4]) {
        self.background_color = color;
        self.touch();
    }

    /// Emit a mask of the voxels written from in-bounds samples.
    pub fn set_generate_stencil_output(&mut self, on: bool) {
        self.generate_stencil_output = on;
        self.touch();
    }

    /// How the tile driver decomposes the output across threads.
    pub fn set_split_mode(&mut self, mode: SplitMode) {
        self.split_mode = mode;
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let filter = ImageReslice::new();
        assert!(filter.compute_output_spacing);
        assert!(filter.pass_direction_to_output);
        assert_eq!(filter.interpolation_mode, InterpolationMode::Nearest);
        assert_eq!(filter.slab_mode, SlabMode::Mean);
        assert_eq!(filter.border_thickness, 0.5);
        assert!(filter.optimization);
    }

    #[test]
    fn test_parameter_validation() {
        let mut filter = ImageReslice::new();
        assert!(filter.set_output_dimensionality(0).is_err());
        assert!(filter.set_output_dimensionality(2).is_ok());
        assert!(filter.set_slab_number_of_slices(0).is_err());
        assert!(filter.set_slab_slice_spacing_fraction(0.0).is_err());
        assert!(filter.set_slab_slice_spacing_fraction(1.5).is_err());
        assert!(filter.set_slab_slice_spacing_fraction(0.5).is_ok());
        assert!(filter.set_border_thickness(-1.0).is_err());
    }

    #[test]
    fn test_axes_convenience_setters() {
        let mut filter = ImageReslice::new();
        filter.set_reslice_axes_direction_cosines(
            [0.0, 1.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0],
        );
        filter.set_reslice_axes_origin([5.0, 6.0, 7.0]);
        let axes = filter.reslice_axes().unwrap();
        assert_eq!(axes[(1, 0)], 1.0);
        assert_eq!(axes[(0, 1)], -1.0);
        assert_eq!(axes[(0, 3)], 5.0);
        assert_eq!(axes[(3, 3)], 1.0);
    }

    #[test]
    fn test_modified_time_advances() {
        let mut filter = ImageReslice::new();
        let t0 = filter.modified_time();
        filter.set_scalar_scale(2.0);
        assert!(filter.modified_time() > t0);
    }
}
