//! The general execute path.
//!
//! Walks output voxels in z/y/x order with incrementally updated mapped
//! positions, handles perspective, slab sampling, the nonlinear residual,
//! stencil gating and background fill, and converts each in-bounds segment
//! to the output type. Works for every matrix, interpolator and border mode.

use revox_core::interpolation::{BorderMode, InterpolationMode};
use revox_core::spatial::{round, Extent};
use revox_core::stencil::Span;

use crate::convert::{copy_pixel, fill_pixels, rescale};
use crate::driver::{OutputView, ReslicePass, StencilRun};

/// Fill a whole tile with the background color.
pub(crate) fn fill_tile_background(
    pass: &ReslicePass<'_>,
    tile: &Extent,
    out: &OutputView<'_>,
) {
    let n = tile.size(0);
    for z in tile.min(2)..=tile.max(2) {
        for y in tile.min(1)..=tile.max(1) {
            let row = unsafe { out.row(y, z, tile.min(0), n) };
            fill_pixels(row, &pass.background);
        }
    }
}

pub(crate) fn row_spans(
    pass: &ReslicePass<'_>,
    y: i32,
    z: i32,
    x_lo: i32,
    x_hi: i32,
) -> Vec<Span> {
    match pass.stencil {
        Some(stencil) => stencil.spans(y, z, x_lo, x_hi).collect(),
        None => vec![Span {
            x_lo,
            x_hi,
            inside: true,
        }],
    }
}

pub(crate) fn execute_general(
    pass: &ReslicePass<'_>,
    tile: &Extent,
    out: &OutputView<'_>,
    runs: &mut Vec<StencilRun>,
) {
    let m = &pass.matrix;
    let x_axis = [m[(0, 0)], m[(1, 0)], m[(2, 0)], m[(3, 0)]];
    let y_axis = [m[(0, 1)], m[(1, 1)], m[(2, 1)], m[(3, 1)]];
    let z_axis = [m[(0, 2)], m[(1, 2)], m[(2, 2)], m[(3, 2)]];
    let origin = [m[(0, 3)], m[(1, 3)], m[(2, 3)], m[(3, 3)]];

    let perspective =
        m[(3, 0)] != 0.0 || m[(3, 1)] != 0.0 || m[(3, 2)] != 0.0 || m[(3, 3)] != 1.0;
    let nsamples = pass.nsamples.max(1);
    let ncomp = pass.source.components();
    let rescale_needed = pass.scalar_shift != 0.0 || pass.scalar_scale != 1.0;
    let interpolator = &*pass.interpolator;
    let in_extent = *pass.source.extent();

    // the source-pixel byte copy works whenever no arithmetic can alter the
    // value on the way through
    let optimize_nearest = interpolator.interpolation_mode() == Some(InterpolationMode::Nearest)
        && interpolator.border_mode() == BorderMode::Clamp
        && pass.residual.is_none()
        && !perspective
        && !rescale_needed
        && pass.source.kind() == pass.out_kind
        && pass.border
        && pass.border_thickness == 0.5
        && nsamples <= 1;

    let mut scratch = vec![0.0f64; ncomp * (tile.size(0) + nsamples)];

    for z in tile.min(2)..=tile.max(2) {
        let mut p0 = [0.0; 4];
        for c in 0..4 {
            p0[c] = origin[c] + f64::from(z) * z_axis[c];
        }
        for y in tile.min(1)..=tile.max(1) {
            let mut p1 = [0.0; 4];
            for c in 0..4 {
                p1[c] = p0[c] + f64::from(y) * y_axis[c];
            }
            for span in row_spans(pass, y, z, tile.min(0), tile.max(0)) {
                if !span.inside {
                    let n = (span.x_hi - span.x_lo + 1) as usize;
                    let row = unsafe { out.row(y, z, span.x_lo, n) };
                    fill_pixels(row, &pass.background);
                } else if optimize_nearest {
                    nearest_span(pass, &p1, &x_axis, &in_extent, &span, y, z, out, runs);
                } else {
                    general_span(
                        pass,
                        &p1,
                        &x_axis,
                        &z_axis,
                        perspective,
                        nsamples,
                        rescale_needed,
                        &in_extent,
                        &span,
                        y,
                        z,
                        out,
                        &mut scratch,
                        runs,
                    );
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn general_span(
    pass: &ReslicePass<'_>,
    p1: &[f64; 4],
    x_axis: &[f64; 4],
    z_axis: &[f64; 4],
    perspective: bool,
    nsamples: usize,
    rescale_needed: bool,
    in_extent: &Extent,
    span: &Span,
    y: i32,
    z: i32,
    out: &OutputView<'_>,
    scratch: &mut [f64],
    runs: &mut Vec<StencilRun>,
) {
    let interpolator = &*pass.interpolator;
    let ncomp = pass.source.components();

    let mut was_in = true;
    let mut is_in = true;
    let mut start_x = span.x_lo;
    let mut x = span.x_lo;
    let mut cursor = 0usize;

    while start_x <= span.x_hi {
        while x <= span.x_hi && is_in == was_in {
            let mut p2 = [0.0; 4];
            for c in 0..4 {
                p2[c] = p1[c] + f64::from(x) * x_axis[c];
            }

            is_in = false;
            let mut sample_count = 0usize;
            for sample in 0..nsamples {
                let mut p = p2;
                if nsamples > 1 {
                    let s = (sample as f64 - 0.5 * (nsamples - 1) as f64)
                        * pass.slab_spacing_fraction;
                    for c in 0..4 {
                        p[c] = p2[c] + s * z_axis[c];
                    }
                }
                if perspective {
                    let f = 1.0 / p[3];
                    p[0] *= f;
                    p[1] *= f;
                    p[2] *= f;
                }
                let mut q = [p[0], p[1], p[2]];
                if let Some(residual) = &pass.residual {
                    q = residual.apply(q);
                }
                if interpolator.check_bounds(in_extent, q) {
                    is_in = true;
                    let slot = cursor + sample_count * ncomp;
                    interpolator.interpolate(&pass.source, q, &mut scratch[slot..slot + ncomp]);
                    sample_count += 1;
                }
            }
            if sample_count > 1 {
                (pass.composite)(
                    &mut scratch[cursor..cursor + sample_count * ncomp],
                    ncomp,
                    sample_count,
                );
            }
            cursor += ncomp;

            if x == span.x_lo {
                was_in = is_in;
            }
            x += 1;
        }

        // emit the finished segment; the voxel that flipped the state
        // belongs to the next one
        let end_x = x - 1 - i32::from(is_in != was_in);
        let n = (end_x - start_x + 1) as usize;
        let row = unsafe { out.row(y, z, start_x, n) };
        if was_in {
            if pass.generate_stencil {
                runs.push(StencilRun {
                    x_lo: start_x,
                    x_hi: end_x,
                    y,
                    z,
                });
            }
            let lo = (start_x - span.x_lo) as usize * ncomp;
            let segment = &mut scratch[lo..lo + n * ncomp];
            if rescale_needed {
                rescale(segment, pass.scalar_shift, pass.scalar_scale);
            }
            (pass.convert)(segment, row);
        } else {
            fill_pixels(row, &pass.background);
        }
        start_x = end_x + 1;
        was_in = is_in;
    }
}

/// Nearest-neighbor sub-path: round, bounds-test against the raw extent and
/// copy the pixel bytes directly.
#[allow(clippy::too_many_arguments)]
fn nearest_span(
    pass: &ReslicePass<'_>,
    p1: &[f64; 4],
    x_axis: &[f64; 4],
    in_extent: &Extent,
    span: &Span,
    y: i32,
    z: i32,
    out: &OutputView<'_>,
    runs: &mut Vec<StencilRun>,
) {
    let in_bytes = pass.source.data().as_bytes();
    let elem_size = pass.source.kind().size_in_bytes();
    let bpp = elem_size * pass.source.components();

    let mut start_x = span.x_lo;
    let mut end_x = span.x_lo - 1;
    let mut is_in = false;

    for x in span.x_lo..=span.x_hi {
        let px = p1[0] + f64::from(x) * x_axis[0];
        let py = p1[1] + f64::from(x) * x_axis[1];
        let pz = p1[2] + f64::from(x) * x_axis[2];

        let i = round(px);
        let j = round(py);
        let k = round(pz);

        let inside = i >= i64::from(in_extent.min(0))
            && i <= i64::from(in_extent.max(0))
            && j >= i64::from(in_extent.min(1))
            && j <= i64::from(in_extent.max(1))
            && k >= i64::from(in_extent.min(2))
            && k <= i64::from(in_extent.max(2));

        if inside {
            if !is_in {
                // clear the leading out-of-bounds voxels
                start_x = x;
                is_in = true;
                let leading = (x - span.x_lo) as usize;
                if leading > 0 {
                    let row = unsafe { out.row(y, z, span.x_lo, leading) };
                    fill_pixels(row, &pass.background);
                }
            }
            end_x = x;
            let offset =
                pass.source.element_offset(i as i32, j as i32, k as i32) * elem_size;
            let dst = unsafe { out.row(y, z, x, 1) };
            copy_pixel(dst, &in_bytes[offset..offset + bpp]);
        } else if is_in {
            // the in-bounds region of an affine row is one segment
            break;
        }
    }

    let trailing = (span.x_hi - end_x) as usize;
    if trailing > 0 {
        let row = unsafe { out.row(y, z, end_x + 1, trailing) };
        fill_pixels(row, &pass.background);
    }
    if pass.generate_stencil && end_x >= start_x {
        runs.push(StencilRun {
            x_lo: start_x,
            x_hi: end_x,
            y,
            z,
        });
    }
}
