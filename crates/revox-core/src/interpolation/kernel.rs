//! The default separable kernel set.
//!
//! [`ImageInterpolator`] implements nearest-neighbor, trilinear and tricubic
//! (Catmull-Rom) sampling over any scalar kind, with clamp, repeat and mirror
//! border handling, and advertises the separable-weights capability used by
//! the permute fast path.

use super::source::SourceView;
use super::trait_::{Interpolator, SeparableWeights};
use super::weights::WeightsTable;
use super::{BorderMode, InterpolationMode};
use crate::dispatch_scalar;
use crate::image::Scalar;
use crate::mtime::ModifiedTime;
use crate::spatial::{floor_frac, round, Extent, Matrix4d, FLOOR_TOL};

/// Kernel-based sampler for the three standard interpolation modes.
#[derive(Debug, Clone)]
pub struct ImageInterpolator {
    mode: InterpolationMode,
    border: BorderMode,
    tolerance: f64,
    component_offset: usize,
    component_count: Option<usize>,
    modified: ModifiedTime,
}

impl ImageInterpolator {
    pub fn new(mode: InterpolationMode) -> Self {
        Self {
            mode,
            border: BorderMode::Clamp,
            tolerance: FLOOR_TOL,
            component_offset: 0,
            component_count: None,
            modified: ModifiedTime::now(),
        }
    }

    /// Restrict sampling to a window of the interleaved components.
    ///
    /// `count = None` means all components from the offset on.
    pub fn set_component_window(&mut self, offset: usize, count: Option<usize>) {
        self.component_offset = offset;
        self.component_count = count;
        self.modified = ModifiedTime::now();
    }

    fn interpolate_typed<T: Scalar>(&self, src: &SourceView<'_>, p: [f64; 3], out: &mut [f64]) {
        let Some(data) = src.data().as_slice::<T>() else {
            return;
        };
        let ext = src.extent();
        let mut idx = [[0i32; 4]; 3];
        let mut wts = [[0f64; 4]; 3];
        let mut k = [0usize; 3];
        for axis in 0..3 {
            k[axis] = axis_taps(
                self.mode,
                self.border,
                p[axis],
                ext.min(axis),
                ext.max(axis),
                &mut idx[axis],
                &mut wts[axis],
            );
        }
        let inc = src.increments();
        let ncomp = src.components();
        let coff = src.component_offset();
        for v in out[..ncomp].iter_mut() {
            *v = 0.0;
        }
        for iz in 0..k[2] {
            let zoff = (idx[2][iz] - ext.min(2)) as usize * inc[2];
            for iy in 0..k[1] {
                let wzy = wts[2][iz] * wts[1][iy];
                let yzoff = zoff + (idx[1][iy] - ext.min(1)) as usize * inc[1];
                for ix in 0..k[0] {
                    let w = wzy * wts[0][ix];
                    let base = yzoff + (idx[0][ix] - ext.min(0)) as usize * inc[0] + coff;
                    for c in 0..ncomp {
                        out[c] += w * data[base + c].to_f64();
                    }
                }
            }
        }
    }

    fn row_typed<T: Scalar>(
        &self,
        src: &SourceView<'_>,
        table: &WeightsTable,
        x0: i32,
        y: i32,
        z: i32,
        out: &mut [f64],
        n: usize,
    ) {
        let Some(data) = src.data().as_slice::<T>() else {
            return;
        };
        let ncomp = src.components();
        let coff = src.component_offset();
        // nest the tap loops in input-axis order (z outer, x inner) so the
        // sums match pointwise interpolation bit for bit
        let perm = table.perm();
        let mut ord = [0usize; 3];
        for (o, &r) in perm.iter().enumerate() {
            ord[2 - r] = o;
        }
        let py = table.positions(1, y);
        let wy = table.weights(1, y);
        let pz = table.positions(2, z);
        let wz = table.weights(2, z);
        for i in 0..n {
            let px = table.positions(0, x0 + i as i32);
            let wx = table.weights(0, x0 + i as i32);
            let taps: [(&[usize], &[f64]); 3] = [(px, wx), (py, wy), (pz, wz)];
            let (pa, wa) = taps[ord[0]];
            let (pb, wb) = taps[ord[1]];
            let (pc, wc) = taps[ord[2]];
            let acc = &mut out[i * ncomp..(i + 1) * ncomp];
            for v in acc.iter_mut() {
                *v = 0.0;
            }
            for (oa, &va) in pa.iter().zip(wa) {
                for (ob, &vb) in pb.iter().zip(wb) {
                    let wab = va * vb;
                    let oab = oa + ob;
                    for (oc, &vc) in pc.iter().zip(wc) {
                        let w = wab * vc;
                        let base = oab + oc + coff;
                        for c in 0..ncomp {
                            acc[c] += w * data[base + c].to_f64();
                        }
                    }
                }
            }
        }
    }

    fn axis_in_bounds(&self, p: f64, lo: i32, hi: i32) -> bool {
        p >= f64::from(lo) - self.tolerance && p <= f64::from(hi) + self.tolerance
    }
}

impl Default for ImageInterpolator {
    fn default() -> Self {
        Self::new(InterpolationMode::Nearest)
    }
}

/// Resolve an integer tap through the border mode into the extent.
#[inline]
fn resolve_index(border: BorderMode, i: i64, lo: i32, hi: i32) -> i32 {
    let lo64 = i64::from(lo);
    let n = i64::from(hi) - lo64 + 1;
    match border {
        BorderMode::Clamp => i.clamp(lo64, i64::from(hi)) as i32,
        BorderMode::Repeat => (lo64 + (i - lo64).rem_euclid(n)) as i32,
        BorderMode::Mirror => {
            let m = (i - lo64).rem_euclid(2 * n);
            let m = if m >= n { 2 * n - 1 - m } else { m };
            (lo64 + m) as i32
        }
    }
}

/// Catmull-Rom coefficients for a fraction in `[0, 1)`.
#[inline]
fn cubic_weights(f: f64) -> [f64; 4] {
    let fm1 = f - 1.0;
    let fd2 = f * 0.5;
    let ft3 = f * 3.0;
    [
        -fd2 * fm1 * fm1,
        ((ft3 - 2.0) * fd2 - 1.0) * fm1,
        -((ft3 - 4.0) * f - 1.0) * fd2,
        f * fd2 * fm1,
    ]
}

/// Kernel taps and coefficients along one axis; returns the tap count.
#[inline]
fn axis_taps(
    mode: InterpolationMode,
    border: BorderMode,
    p: f64,
    lo: i32,
    hi: i32,
    idx: &mut [i32; 4],
    wts: &mut [f64; 4],
) -> usize {
    match mode {
        InterpolationMode::Nearest => {
            idx[0] = resolve_index(border, round(p), lo, hi);
            wts[0] = 1.0;
            1
        }
        InterpolationMode::Linear => {
            let (i0, f) = floor_frac(p);
            idx[0] = resolve_index(border, i0, lo, hi);
            idx[1] = resolve_index(border, i0 + 1, lo, hi);
            wts[0] = 1.0 - f;
            wts[1] = f;
            2
        }
        InterpolationMode::Cubic => {
            let (i0, f) = floor_frac(p);
            for t in 0..4 {
                idx[t] = resolve_index(border, i0 - 1 + t as i64, lo, hi);
            }
            *wts = cubic_weights(f);
            4
        }
    }
}

impl Interpolator for ImageInterpolator {
    fn boxed_clone(&self) -> Box<dyn Interpolator> {
        Box::new(self.clone())
    }

    fn interpolation_mode(&self) -> Option<InterpolationMode> {
        Some(self.mode)
    }

    fn set_interpolation_mode(&mut self, mode: InterpolationMode) {
        self.mode = mode;
        self.modified = ModifiedTime::now();
    }

    fn border_mode(&self) -> BorderMode {
        self.border
    }

    fn set_border_mode(&mut self, mode: BorderMode) {
        self.border = mode;
        self.modified = ModifiedTime::now();
    }

    fn tolerance(&self) -> f64 {
        self.tolerance
    }

    fn set_tolerance(&mut self, tolerance: f64) {
        self.tolerance = tolerance.max(FLOOR_TOL);
        self.modified = ModifiedTime::now();
    }

    fn compute_support_size(&self, matrix: Option<&Matrix4d>) -> [i32; 3] {
        let mut size = [self.mode.support_size(); 3];
        if let Some(m) = matrix {
            // projective matrices cannot be analyzed per axis
            if m[(3, 0)] != 0.0 || m[(3, 1)] != 0.0 || m[(3, 2)] != 0.0 || m[(3, 3)] != 1.0 {
                return size;
            }
            for (i, s) in size.iter_mut().enumerate() {
                // a fully integer row samples on the grid; the kernel
                // footprint collapses to a single voxel
                let integral = (0..4).all(|j| floor_frac(m[(i, j)]).1 == 0.0);
                if integral {
                    *s = 1;
                }
            }
        }
        size
    }

    fn is_separable(&self) -> bool {
        true
    }

    fn interpolate(&self, source: &SourceView<'_>, p: [f64; 3], out: &mut [f64]) {
        dispatch_scalar!(source.kind(), T => self.interpolate_typed::<T>(source, p, out));
    }

    fn source_components(&self, total: usize) -> (usize, usize) {
        let offset = self.component_offset.min(total.saturating_sub(1));
        let count = self
            .component_count
            .unwrap_or(total - offset)
            .clamp(1, total - offset);
        (offset, count)
    }

    fn as_separable(&self) -> Option<&dyn SeparableWeights> {
        Some(self)
    }

    fn modified_time(&self) -> ModifiedTime {
        self.modified
    }
}

impl SeparableWeights for ImageInterpolator {
    fn precompute_weights(
        &self,
        source: &SourceView<'_>,
        matrix: &Matrix4d,
        extent: &Extent,
    ) -> WeightsTable {
        let k = self.mode.support_size() as usize;
        let inc = source.increments();
        let in_ext = source.extent();
        let mut positions: [Vec<usize>; 3] = Default::default();
        let mut weights: [Vec<f64>; 3] = Default::default();
        let mut perm = [0usize; 3];
        let mut clip = *extent;

        for out_axis in 0..3 {
            // the input row driven by this output axis
            let row = (0..3)
                .find(|&r| matrix[(r, out_axis)] != 0.0)
                .unwrap_or(out_axis);
            perm[out_axis] = row;
            let scale = matrix[(row, out_axis)];
            let shift = matrix[(row, 3)];
            let lo = in_ext.min(row);
            let hi = in_ext.max(row);
            let stride = inc[row];

            let n = extent.size(out_axis);
            let mut pos = Vec::with_capacity(n * k);
            let mut wts = Vec::with_capacity(n * k);
            let mut clip_lo = i32::MAX;
            let mut clip_hi = i32::MIN;
            for idx in extent.min(out_axis)..=extent.max(out_axis) {
                let p = scale * f64::from(idx) + shift;
                if self.axis_in_bounds(p, lo, hi) {
                    clip_lo = clip_lo.min(idx);
                    clip_hi = clip_hi.max(idx);
                }
                let mut ti = [0i32; 4];
                let mut tw = [0f64; 4];
                let used = axis_taps(self.mode, self.border, p, lo, hi, &mut ti, &mut tw);
                for t in 0..used {
                    pos.push((ti[t] - lo) as usize * stride);
                    wts.push(tw[t]);
                }
            }
            if clip_lo > clip_hi {
                clip.set_min(out_axis, extent.min(out_axis));
                clip.set_max(out_axis, extent.min(out_axis) - 1);
            } else {
                clip.set_min(out_axis, clip_lo);
                clip.set_max(out_axis, clip_hi);
            }
            positions[out_axis] = pos;
            weights[out_axis] = wts;
        }

        WeightsTable::new([k; 3], *extent, clip, perm, positions, weights)
    }

    fn interpolate_row(
        &self,
        source: &SourceView<'_>,
        table: &WeightsTable,
        x0: i32,
        y: i32,
        z: i32,
        out: &mut [f64],
        n: usize,
    ) {
        dispatch_scalar!(source.kind(), T => self.row_typed::<T>(source, table, x0, y, z, out, n));
    }
}
