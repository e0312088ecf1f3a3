//! Interpolator traits.

use super::source::SourceView;
use super::weights::WeightsTable;
use super::{BorderMode, InterpolationMode};
use crate::mtime::ModifiedTime;
use crate::spatial::{Extent, Matrix4d};

/// A polymorphic image sampler.
///
/// Implementations read a [`SourceView`] at continuous voxel indices and
/// write one double per sampled component. The engine owns border mode and
/// tolerance configuration; both default to the strictest settings.
pub trait Interpolator: Send + Sync {
    /// Clone into a box, for per-pass configuration snapshots.
    fn boxed_clone(&self) -> Box<dyn Interpolator>;

    /// The built-in kernel this sampler runs, when it is one of the standard
    /// set. Foreign kernels return `None` and are never downgraded.
    fn interpolation_mode(&self) -> Option<InterpolationMode> {
        None
    }

    /// Switch the built-in kernel. A no-op for foreign kernels.
    fn set_interpolation_mode(&mut self, _mode: InterpolationMode) {}

    fn border_mode(&self) -> BorderMode;

    fn set_border_mode(&mut self, mode: BorderMode);

    /// How far outside the strict extent a sample point still counts as in
    /// bounds.
    fn tolerance(&self) -> f64;

    fn set_tolerance(&mut self, tolerance: f64);

    /// Kernel footprint per input axis.
    ///
    /// The index matrix is passed so that kernels can shrink their footprint
    /// on axes where every sampled position lands exactly on the input grid,
    /// and so that non-separable kernels can oversample anisotropically.
    fn compute_support_size(&self, matrix: Option<&Matrix4d>) -> [i32; 3];

    /// Whether the kernel factors along axes.
    fn is_separable(&self) -> bool;

    /// Tolerance-widened bounds test for one sample point.
    fn check_bounds(&self, extent: &Extent, p: [f64; 3]) -> bool {
        let tol = self.tolerance();
        (0..3).all(|axis| {
            p[axis] >= f64::from(extent.min(axis)) - tol
                && p[axis] <= f64::from(extent.max(axis)) + tol
        })
    }

    /// Sample at a continuous index, writing `source.components()` doubles.
    ///
    /// The point must have passed [`check_bounds`](Interpolator::check_bounds);
    /// taps that fall outside the extent resolve through the border mode.
    fn interpolate(&self, source: &SourceView<'_>, p: [f64; 3], out: &mut [f64]);

    /// Component window this sampler reads from a buffer with `total`
    /// interleaved components: `(offset, count)`.
    fn source_components(&self, total: usize) -> (usize, usize) {
        (0, total)
    }

    /// The separable-weights capability, when the kernel supports it.
    fn as_separable(&self) -> Option<&dyn SeparableWeights> {
        None
    }

    fn modified_time(&self) -> ModifiedTime {
        ModifiedTime::default()
    }
}

impl Clone for Box<dyn Interpolator> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}

/// Per-axis weight precomputation for separable kernels.
///
/// This is the only capability the permute fast path needs, kept separate so
/// the engine can probe for it.
pub trait SeparableWeights {
    /// Build per-axis tables for an output extent under a
    /// permutation+scale+translation index matrix.
    fn precompute_weights(
        &self,
        source: &SourceView<'_>,
        matrix: &Matrix4d,
        extent: &Extent,
    ) -> WeightsTable;

    /// Evaluate `n` consecutive output voxels in x from the tables into
    /// `out` (`n * source.components()` doubles).
    fn interpolate_row(
        &self,
        source: &SourceView<'_>,
        table: &WeightsTable,
        x0: i32,
        y: i32,
        z: i32,
        out: &mut [f64],
        n: usize,
    );
}
