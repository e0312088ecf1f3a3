//! The permute execute path.
//!
//! When the index matrix is permutation+scale+translation and the
//! interpolator is separable, per-axis weights are tabulated once per tile
//! and rows are evaluated by table lookup. Voxels outside the tabulated
//! in-bounds clip get the background color without being sampled at all.

use revox_core::interpolation::{InterpolationMode, SourceView, WeightsTable};
use revox_core::spatial::Extent;

use crate::convert::{copy_pixel, fill_pixels, rescale};
use crate::driver::{OutputView, ReslicePass, StencilRun};
use crate::execute::{fill_tile_background, row_spans};

pub(crate) fn execute_permute(
    pass: &ReslicePass<'_>,
    tile: &Extent,
    out: &OutputView<'_>,
    runs: &mut Vec<StencilRun>,
) {
    let nsamples = pass.nsamples.max(1);
    let ncomp = pass.source.components();
    let rescale_needed = pass.scalar_shift != 0.0 || pass.scalar_scale != 1.0;

    // shift the slab so its samples land on consecutive tabulated z rows
    let mut matrix = pass.matrix;
    let mut sample_extent = *tile;
    if nsamples > 1 {
        for i in 0..3 {
            matrix[(i, 3)] -= 0.5 * matrix[(i, 2)] * nsamples as f64;
        }
        sample_extent.set_max(2, sample_extent.max(2) + nsamples as i32 - 1);
    }

    let Some(separable) = pass.interpolator.as_separable() else {
        tracing::warn!(
            "permute path selected without separable weights; filling tile with background"
        );
        fill_tile_background(pass, tile, out);
        return;
    };
    let table = separable.precompute_weights(&pass.source, &matrix, &sample_extent);
    let clip = *table.clip();

    // nearest samples of the same kind can go straight from buffer to buffer
    let do_conversion = !(pass.interpolator.interpolation_mode()
        == Some(InterpolationMode::Nearest)
        && pass.source.kind() == pass.out_kind
        && !rescale_needed
        && nsamples == 1);

    // the region painted from input data; everything else is background
    let empty = clip.is_empty();
    let mut iter = clip;
    if empty {
        for axis in 0..3 {
            iter.set_min(axis, tile.min(axis));
            iter.set_max(axis, tile.min(axis) - 1);
        }
    } else if nsamples > 1 {
        // rows whose slab only partially overlaps the clip still produce
        // output from the overlapping samples; the clip is in slab-shifted
        // row space, so only the lower side extends
        let adjust = nsamples as i32 - 1;
        iter.set_min(2, (clip.min(2) - adjust).max(tile.min(2)));
        iter.set_max(2, clip.max(2).min(tile.max(2)));
    }

    let row_len = ncomp * tile.size(0);
    let mut float_row = vec![0.0f64; row_len];
    let mut sum_row = vec![0.0f64; if nsamples > 1 { row_len } else { 0 }];

    for z in tile.min(2)..=tile.max(2) {
        let z_in = !empty && z >= iter.min(2) && z <= iter.max(2);
        for y in tile.min(1)..=tile.max(1) {
            if !z_in || y < iter.min(1) || y > iter.max(1) {
                let row = unsafe { out.row(y, z, tile.min(0), tile.size(0)) };
                fill_pixels(row, &pass.background);
                continue;
            }

            // leading pixels before the clip
            if iter.min(0) > tile.min(0) {
                let n = (iter.min(0) - tile.min(0)) as usize;
                let row = unsafe { out.row(y, z, tile.min(0), n) };
                fill_pixels(row, &pass.background);
            }

            for span in row_spans(pass, y, z, iter.min(0), iter.max(0)) {
                let n = (span.x_hi - span.x_lo + 1) as usize;
                let out_row = unsafe { out.row(y, z, span.x_lo, n) };
                if !span.inside {
                    fill_pixels(out_row, &pass.background);
                    continue;
                }

                if do_conversion {
                    // clamp the slab to the rows the clip actually covers
                    let lower_skip = (clip.min(2) - z).max(0) as usize;
                    let upper_skip =
                        ((z + nsamples as i32 - 1) - clip.max(2)).max(0) as usize;
                    let effective = nsamples - lower_skip - upper_skip;
                    debug_assert!(effective >= 1);
                    let mut z1 = z + lower_skip as i32;
                    for sample in 0..effective {
                        if effective > 1 {
                            separable.interpolate_row(
                                &pass.source,
                                &table,
                                span.x_lo,
                                y,
                                z1,
                                &mut sum_row[..n * ncomp],
                                n,
                            );
                            (pass.row_composite)(
                                &mut float_row[..n * ncomp],
                                &sum_row[..n * ncomp],
                                sample,
                                effective,
                            );
                        } else {
                            separable.interpolate_row(
                                &pass.source,
                                &table,
                                span.x_lo,
                                y,
                                z1,
                                &mut float_row[..n * ncomp],
                                n,
                            );
                        }
                        z1 += 1;
                    }
                    if rescale_needed {
                        rescale(&mut float_row[..n * ncomp], pass.scalar_shift, pass.scalar_scale);
                    }
                    (pass.convert)(&float_row[..n * ncomp], out_row);
                } else {
                    copy_row_nearest(&pass.source, &table, span.x_lo, y, z, out_row, n);
                }

                if pass.generate_stencil {
                    runs.push(StencilRun {
                        x_lo: span.x_lo,
                        x_hi: span.x_hi,
                        y,
                        z,
                    });
                }
            }

            // trailing pixels after the clip
            if iter.max(0) < tile.max(0) {
                let n = (tile.max(0) - iter.max(0)) as usize;
                let row = unsafe { out.row(y, z, iter.max(0) + 1, n) };
                fill_pixels(row, &pass.background);
            }
        }
    }
}

/// Nearest-neighbor lookup-and-copy straight into the output bytes.
fn copy_row_nearest(
    source: &SourceView<'_>,
    table: &WeightsTable,
    x0: i32,
    y: i32,
    z: i32,
    out_row: &mut [u8],
    n: usize,
) {
    let data = source.data().as_bytes();
    let elem_size = source.kind().size_in_bytes();
    let bpp = elem_size * source.components();
    let base = table.positions(1, y)[0] + table.positions(2, z)[0] + source.component_offset();
    for i in 0..n {
        let px = table.positions(0, x0 + i as i32)[0];
        let offset = (base + px) * elem_size;
        copy_pixel(&mut out_row[i * bpp..(i + 1) * bpp], &data[offset..offset + bpp]);
    }
}
