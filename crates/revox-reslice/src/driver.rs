//! Pass lifecycle and the threaded tile driver.

use rayon::prelude::*;
use std::marker::PhantomData;

use revox_core::image::{Image, ImageInfo, ScalarKind};
use revox_core::interpolation::{
    BorderMode, ImageInterpolator, InterpolationMode, Interpolator, SourceView,
};
use revox_core::spatial::{Extent, Matrix4d, FLOOR_TOL};
use revox_core::stencil::ImageStencil;

use crate::composite::{
    select_composite, select_row_composite, CompositeFn, RowCompositeFn,
};
use crate::convert::{background_pixel, needs_clamp, select_convert, ConvertFn};
use crate::error::{ResliceError, Result};
use crate::filter::{ImageReslice, SlabMode};
use crate::index_matrix::{
    build_index_matrix, can_use_nearest, is_permutation_matrix, IndexTransform, Residual,
};
use crate::{execute, permute};

/// How the tile driver decomposes the output extent across threads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SplitMode {
    /// Split along z only.
    #[default]
    Slab,
    /// Split along z, then y.
    Beam,
    /// Split along all three axes.
    Block,
}

/// One written-voxel run recorded while executing a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilRun {
    pub x_lo: i32,
    pub x_hi: i32,
    pub y: i32,
    pub z: i32,
}

/// The result of [`ImageReslice::execute`].
pub struct ResliceOutput {
    pub image: Image,
    /// The written-voxel mask; populated only when stencil output is on.
    pub stencil: Option<ImageStencil>,
}

/// Raw, tile-disjoint access to the output buffer.
///
/// Tiles never overlap, so concurrent writers touch disjoint rows; that
/// disjointness is the safety argument for sharing this across threads.
pub(crate) struct OutputView<'a> {
    ptr: *mut u8,
    extent: Extent,
    bytes_per_pixel: usize,
    _marker: PhantomData<&'a mut [u8]>,
}

unsafe impl Send for OutputView<'_> {}
unsafe impl Sync for OutputView<'_> {}

impl<'a> OutputView<'a> {
    pub fn new(image: &'a mut Image) -> Self {
        let extent = *image.extent();
        let bytes_per_pixel = image.scalar_kind().size_in_bytes() * image.num_components();
        let ptr = image.data_mut().as_bytes_mut().as_mut_ptr();
        Self {
            ptr,
            extent,
            bytes_per_pixel,
            _marker: PhantomData,
        }
    }

    /// A mutable view of `n` voxels starting at `(x0, y, z)`.
    ///
    /// # Safety
    ///
    /// The voxels must lie inside the extent and no other thread may hold a
    /// slice overlapping them.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn row(&self, y: i32, z: i32, x0: i32, n: usize) -> &mut [u8] {
        let nx = self.extent.size(0);
        let ny = self.extent.size(1);
        let voxel = ((z - self.extent.min(2)) as usize * ny
            + (y - self.extent.min(1)) as usize)
            * nx
            + (x0 - self.extent.min(0)) as usize;
        std::slice::from_raw_parts_mut(
            self.ptr.add(voxel * self.bytes_per_pixel),
            n * self.bytes_per_pixel,
        )
    }
}

/// An immutable per-pass snapshot: geometry, index matrix, configured
/// interpolator and selected inner-loop functions.
///
/// Built once per pass before any threads run; tiles execute against it
/// concurrently.
pub struct ReslicePass<'a> {
    pub(crate) source: SourceView<'a>,
    pub(crate) stencil: Option<&'a ImageStencil>,
    pub(crate) out_info: ImageInfo,
    pub(crate) out_kind: ScalarKind,
    pub(crate) out_components: usize,
    pub(crate) matrix: Matrix4d,
    pub(crate) residual: Option<Residual<'a>>,
    pub(crate) interpolator: Box<dyn Interpolator>,
    pub(crate) use_permute: bool,
    pub(crate) hit_input_extent: bool,
    pub(crate) nsamples: usize,
    pub(crate) slab_spacing_fraction: f64,
    pub(crate) scalar_shift: f64,
    pub(crate) scalar_scale: f64,
    pub(crate) background: Vec<u8>,
    pub(crate) convert: ConvertFn,
    pub(crate) composite: CompositeFn,
    pub(crate) row_composite: RowCompositeFn,
    pub(crate) generate_stencil: bool,
    pub(crate) border: bool,
    pub(crate) border_thickness: f64,
}

impl ReslicePass<'_> {
    pub fn output_info(&self) -> &ImageInfo {
        &self.out_info
    }

    pub fn output_scalar_kind(&self) -> ScalarKind {
        self.out_kind
    }

    pub fn num_components(&self) -> usize {
        self.out_components
    }

    /// False when every sampled position misses the input extent.
    pub fn hit_input_extent(&self) -> bool {
        self.hit_input_extent
    }

    /// Whether tiles run through the axis-aligned fast path.
    pub fn uses_permute_path(&self) -> bool {
        self.use_permute
    }

    /// Execute one tile sequentially into `output`.
    ///
    /// The output image must have been allocated with the pass geometry.
    /// Written-voxel runs are appended to `runs` in ascending x per row.
    pub fn execute_tile(
        &self,
        tile: &Extent,
        output: &mut Image,
        runs: &mut Vec<StencilRun>,
    ) -> Result<()> {
        if output.info() != &self.out_info
            || output.scalar_kind() != self.out_kind
            || output.num_components() != self.out_components
        {
            return Err(ResliceError::output_mismatch(
                "output image does not match the pass geometry",
            ));
        }
        let tile = tile.intersect(output.extent());
        if tile.is_empty() {
            return Ok(());
        }
        let view = OutputView::new(output);
        self.execute_tile_raw(&tile, &view, runs);
        Ok(())
    }

    pub(crate) fn execute_tile_raw(
        &self,
        tile: &Extent,
        out: &OutputView<'_>,
        runs: &mut Vec<StencilRun>,
    ) {
        if !self.hit_input_extent {
            execute::fill_tile_background(self, tile, out);
        } else if self.use_permute {
            permute::execute_permute(self, tile, out, runs);
        } else {
            execute::execute_general(self, tile, out, runs);
        }
    }
}

impl ImageReslice {
    /// Clone the interpolator and configure it for this pass: border mode
    /// and tolerance from the filter, plus the nearest-neighbor downgrade
    /// when sampling provably lands on the input grid.
    pub(crate) fn configured_interpolator(
        &self,
        it: &IndexTransform,
        out_whole: &Extent,
    ) -> (Box<dyn Interpolator>, bool) {
        let mut interpolator: Box<dyn Interpolator> = match &self.interpolator {
            Some(i) => i.clone(),
            None => Box::new(ImageInterpolator::new(self.interpolation_mode)),
        };

        let mut use_permute = false;
        if self.optimization
            && !it.nonlinear
            && self.slab_slice_spacing_fraction == 1.0
            && interpolator.is_separable()
            && is_permutation_matrix(&it.matrix)
        {
            use_permute = true;
            if can_use_nearest(&it.matrix, out_whole) {
                interpolator.set_interpolation_mode(InterpolationMode::Nearest);
            }
        }

        let border_mode = if self.mirror {
            BorderMode::Mirror
        } else if self.wrap {
            BorderMode::Repeat
        } else {
            BorderMode::Clamp
        };
        interpolator.set_border_mode(border_mode);

        // wrap and mirror make every sample reachable
        let mut tolerance = if self.border { self.border_thickness } else { 0.0 };
        if border_mode != BorderMode::Clamp {
            tolerance = 2.0 * f64::from(i32::MAX);
        }
        interpolator.set_tolerance(tolerance.max(FLOOR_TOL));

        (interpolator, use_permute)
    }

    /// Build the immutable pass snapshot for one input.
    pub fn begin_pass<'a>(
        &'a self,
        input: &'a Image,
        stencil: Option<&'a ImageStencil>,
    ) -> Result<ReslicePass<'a>> {
        if input.extent().is_empty() {
            return Err(ResliceError::invalid_input("input extent is empty"));
        }

        let out_info = self.derive_output_info(input.info());
        let out_kind = self.output_scalar_kind.unwrap_or(input.scalar_kind());
        let it = build_index_matrix(
            self.reslice_axes.as_ref(),
            self.reslice_transform.as_deref(),
            input.info(),
            &out_info,
        );
        let (interpolator, use_permute) = self.configured_interpolator(&it, &out_info.extent);
        let (_, hit_input_extent) =
            self.input_update_extent_inner(input.info(), &it, interpolator.as_ref(), &out_info.extent);

        let (offset, count) = interpolator.source_components(input.num_components());
        let source = SourceView::with_components(input, offset, count);

        let nsamples = self.slab_number_of_slices.max(1) as usize;
        let force_clamp = match interpolator.interpolation_mode() {
            Some(mode) => mode > InterpolationMode::Linear,
            None => true,
        } || (nsamples > 1 && self.slab_mode == SlabMode::Sum);
        let clamp = needs_clamp(
            input.scalar_kind(),
            out_kind,
            self.scalar_shift,
            self.scalar_scale,
            force_clamp,
        );

        let residual = if it.nonlinear {
            self.reslice_transform
                .as_deref()
                .map(|t| Residual::new(t, input.info()))
        } else {
            None
        };

        tracing::debug!(
            use_permute,
            hit_input_extent,
            nonlinear = it.nonlinear,
            "reslice pass configured"
        );

        Ok(ReslicePass {
            source,
            stencil,
            out_kind,
            out_components: count,
            matrix: it.matrix,
            residual,
            use_permute,
            hit_input_extent,
            nsamples,
            slab_spacing_fraction: self.slab_slice_spacing_fraction,
            scalar_shift: self.scalar_shift,
            scalar_scale: self.scalar_scale,
            background: background_pixel(self.background_color, out_kind, count),
            convert: select_convert(out_kind, clamp),
            composite: select_composite(self.slab_mode, self.slab_trapezoid_integration),
            row_composite: select_row_composite(self.slab_mode, self.slab_trapezoid_integration),
            generate_stencil: self.generate_stencil_output,
            border: self.border,
            border_thickness: self.border_thickness,
            interpolator,
            out_info,
        })
    }

    /// Resample `input`, allocating the output and running tiles in
    /// parallel. The optional stencil restricts which voxels are written.
    pub fn execute(&self, input: &Image, stencil: Option<&ImageStencil>) -> Result<ResliceOutput> {
        let pass = self.begin_pass(input, stencil)?;
        let mut output = Image::try_new(pass.out_info.clone(), pass.out_kind, pass.out_components)?;

        let mut path_len = match self.split_mode {
            SplitMode::Slab => 1,
            SplitMode::Beam => 2,
            SplitMode::Block => 3,
        };
        if self.generate_stencil_output && path_len == 3 {
            // run insertion is per row; splitting x would interleave runs
            tracing::warn!(
                "block splitting is incompatible with stencil output; denying x-axis splits"
            );
            path_len = 2;
        }

        let out_extent = *output.extent();
        let tiles = split_tiles(&out_extent, rayon::current_num_threads(), path_len);
        let run_lists: Vec<Vec<StencilRun>> = {
            let view = OutputView::new(&mut output);
            tiles
                .par_iter()
                .map(|tile| {
                    let mut runs = Vec::new();
                    pass.execute_tile_raw(tile, &view, &mut runs);
                    runs
                })
                .collect()
        };

        let stencil_output = if self.generate_stencil_output {
            let mut mask = ImageStencil::new(out_extent);
            let mut all: Vec<StencilRun> = run_lists.into_iter().flatten().collect();
            all.sort_by_key(|r| (r.z, r.y, r.x_lo));
            for r in all {
                mask.insert_run(r.x_lo, r.x_hi, r.y, r.z);
            }
            Some(mask)
        } else {
            None
        };

        Ok(ResliceOutput {
            image: output,
            stencil: stencil_output,
        })
    }
}

/// Chunk `[lo, lo+n)` into `pieces` near-equal parts.
fn chunk_bounds(lo: i32, n: usize, pieces: usize, piece: usize) -> (i32, i32) {
    let base = n / pieces;
    let extra = n % pieces;
    let start = piece * base + piece.min(extra);
    let len = base + usize::from(piece < extra);
    (lo + start as i32, lo + (start + len) as i32 - 1)
}

/// Decompose an extent into about `target` disjoint tiles.
///
/// `path_len` limits which axes may split: 1 = z only, 2 = z then y,
/// 3 = all three.
pub(crate) fn split_tiles(extent: &Extent, target: usize, path_len: usize) -> Vec<Extent> {
    if extent.is_empty() {
        return Vec::new();
    }
    let target = target.max(1);
    let nz = extent.size(2);
    let tz = target.min(nz).max(1);
    let rem = target.div_ceil(tz);
    let ty = if path_len >= 2 {
        rem.min(extent.size(1)).max(1)
    } else {
        1
    };
    let rem = rem.div_ceil(ty);
    let tx = if path_len >= 3 {
        rem.min(extent.size(0)).max(1)
    } else {
        1
    };

    let mut tiles = Vec::with_capacity(tz * ty * tx);
    for iz in 0..tz {
        let (z0, z1) = chunk_bounds(extent.min(2), nz, tz, iz);
        for iy in 0..ty {
            let (y0, y1) = chunk_bounds(extent.min(1), extent.size(1), ty, iy);
            for ix in 0..tx {
                let (x0, x1) = chunk_bounds(extent.min(0), extent.size(0), tx, ix);
                tiles.push(Extent([x0, x1, y0, y1, z0, z1]));
            }
        }
    }
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_covers_extent() {
        let extent = Extent([0, 9, 0, 9, 0, 9]);
        for (target, path_len) in [(1, 1), (4, 1), (16, 2), (64, 3), (2000, 3)] {
            let tiles = split_tiles(&extent, target, path_len);
            let total: usize = tiles.iter().map(Extent::num_voxels).sum();
            assert_eq!(total, extent.num_voxels(), "target {target} path {path_len}");
        }
    }

    #[test]
    fn test_split_path_len_limits_axes() {
        let extent = Extent([0, 9, 0, 9, 0, 1]);
        // more pieces than z slices, but only z may split
        let tiles = split_tiles(&extent, 8, 1);
        assert_eq!(tiles.len(), 2);
        for tile in &tiles {
            assert_eq!(tile.size(0), 10);
            assert_eq!(tile.size(1), 10);
        }
        // 2d split never divides x
        let tiles = split_tiles(&extent, 8, 2);
        assert!(tiles.len() > 2);
        for tile in &tiles {
            assert_eq!(tile.size(0), 10);
        }
    }

    #[test]
    fn test_chunk_bounds_cover_range() {
        let mut seen = Vec::new();
        for piece in 0..3 {
            let (lo, hi) = chunk_bounds(-2, 10, 3, piece);
            seen.extend(lo..=hi);
        }
        assert_eq!(seen, (-2..8).collect::<Vec<_>>());
    }
}
