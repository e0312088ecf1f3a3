//! Slab compositors.
//!
//! The point compositors fold `n` consecutive samples (interleaved per
//! component) into the leading component slot; the row compositors fuse the
//! same math into the permute path's row loop, keyed by the sample index.

use crate::filter::SlabMode;

/// Fold `buf[0..n*components]` into `buf[0..components]`.
///
/// Only called with `n >= 2`.
pub(crate) type CompositeFn = fn(&mut [f64], usize, usize);

fn slab_sum_with(buf: &mut [f64], components: usize, n: usize, factor: f64) {
    for c in 0..components {
        let mut acc = buf[c];
        for s in 1..n {
            acc += buf[s * components + c];
        }
        buf[c] = acc * factor;
    }
}

fn slab_trapezoid_with(buf: &mut [f64], components: usize, n: usize, factor: f64) {
    for c in 0..components {
        let mut acc = 0.5 * buf[c];
        for s in 1..n - 1 {
            acc += buf[s * components + c];
        }
        acc += 0.5 * buf[(n - 1) * components + c];
        buf[c] = acc * factor;
    }
}

fn composite_mean(buf: &mut [f64], components: usize, n: usize) {
    slab_sum_with(buf, components, n, 1.0 / n as f64);
}

fn composite_mean_trapezoid(buf: &mut [f64], components: usize, n: usize) {
    slab_trapezoid_with(buf, components, n, 1.0 / (n - 1) as f64);
}

fn composite_sum(buf: &mut [f64], components: usize, n: usize) {
    slab_sum_with(buf, components, n, 1.0);
}

fn composite_sum_trapezoid(buf: &mut [f64], components: usize, n: usize) {
    slab_trapezoid_with(buf, components, n, 1.0);
}

fn composite_min(buf: &mut [f64], components: usize, n: usize) {
    for c in 0..components {
        let mut acc = buf[c];
        for s in 1..n {
            let v = buf[s * components + c];
            if v < acc {
                acc = v;
            }
        }
        buf[c] = acc;
    }
}

fn composite_max(buf: &mut [f64], components: usize, n: usize) {
    for c in 0..components {
        let mut acc = buf[c];
        for s in 1..n {
            let v = buf[s * components + c];
            if v > acc {
                acc = v;
            }
        }
        buf[c] = acc;
    }
}

pub(crate) fn select_composite(mode: SlabMode, trapezoid: bool) -> CompositeFn {
    match (mode, trapezoid) {
        (SlabMode::Min, _) => composite_min,
        (SlabMode::Max, _) => composite_max,
        (SlabMode::Mean, false) => composite_mean,
        (SlabMode::Mean, true) => composite_mean_trapezoid,
        (SlabMode::Sum, false) => composite_sum,
        (SlabMode::Sum, true) => composite_sum_trapezoid,
    }
}

/// Accumulate one row of samples into the row accumulator.
///
/// `i` is the sample index out of `n`; the first sample initializes, the
/// last finalizes (mean division, trapezoid end weight).
pub(crate) type RowCompositeFn = fn(&mut [f64], &[f64], usize, usize);

fn row_sum(acc: &mut [f64], row: &[f64], i: usize, _n: usize) {
    if i == 0 {
        acc.copy_from_slice(row);
    } else {
        for (a, r) in acc.iter_mut().zip(row) {
            *a += r;
        }
    }
}

fn row_sum_trapezoid(acc: &mut [f64], row: &[f64], i: usize, n: usize) {
    if i == 0 {
        for (a, r) in acc.iter_mut().zip(row) {
            *a = 0.5 * r;
        }
    } else if i == n - 1 {
        for (a, r) in acc.iter_mut().zip(row) {
            *a += 0.5 * r;
        }
    } else {
        for (a, r) in acc.iter_mut().zip(row) {
            *a += r;
        }
    }
}

fn row_mean(acc: &mut [f64], row: &[f64], i: usize, n: usize) {
    if i == 0 {
        acc.copy_from_slice(row);
    } else if i == n - 1 {
        let f = 1.0 / n as f64;
        for (a, r) in acc.iter_mut().zip(row) {
            *a = (*a + r) * f;
        }
    } else {
        for (a, r) in acc.iter_mut().zip(row) {
            *a += r;
        }
    }
}

fn row_mean_trapezoid(acc: &mut [f64], row: &[f64], i: usize, n: usize) {
    if i == 0 {
        for (a, r) in acc.iter_mut().zip(row) {
            *a = 0.5 * r;
        }
    } else if i == n - 1 {
        let f = 1.0 / (n - 1) as f64;
        for (a, r) in acc.iter_mut().zip(row) {
            *a = (*a + 0.5 * r) * f;
        }
    } else {
        for (a, r) in acc.iter_mut().zip(row) {
            *a += r;
        }
    }
}

fn row_min(acc: &mut [f64], row: &[f64], i: usize, _n: usize) {
    if i == 0 {
        acc.copy_from_slice(row);
    } else {
        for (a, r) in acc.iter_mut().zip(row) {
            if *r < *a {
                *a = *r;
            }
        }
    }
}

fn row_max(acc: &mut [f64], row: &[f64], i: usize, _n: usize) {
    if i == 0 {
        acc.copy_from_slice(row);
    } else {
        for (a, r) in acc.iter_mut().zip(row) {
            if *r > *a {
                *a = *r;
            }
        }
    }
}

pub(crate) fn select_row_composite(mode: SlabMode, trapezoid: bool) -> RowCompositeFn {
    match (mode, trapezoid) {
        (SlabMode::Min, _) => row_min,
        (SlabMode::Max, _) => row_max,
        (SlabMode::Mean, false) => row_mean,
        (SlabMode::Mean, true) => row_mean_trapezoid,
        (SlabMode::Sum, false) => row_sum,
        (SlabMode::Sum, true) => row_sum_trapezoid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_compositors() {
        let mut buf = [1.0, 2.0, 3.0];
        composite_mean(&mut buf, 1, 3);
        assert_eq!(buf[0], 2.0);

        let mut buf = [1.0, 2.0, 3.0];
        composite_sum(&mut buf, 1, 3);
        assert_eq!(buf[0], 6.0);

        let mut buf = [1.0, 2.0, 3.0];
        composite_min(&mut buf, 1, 3);
        assert_eq!(buf[0], 1.0);

        let mut buf = [1.0, 2.0, 3.0];
        composite_max(&mut buf, 1, 3);
        assert_eq!(buf[0], 3.0);
    }

    #[test]
    fn test_trapezoid_endpoints_half_weighted() {
        // samples 2, 4, 6: trapezoid sum = 1 + 4 + 3 = 8
        let mut buf = [2.0, 4.0, 6.0];
        composite_sum_trapezoid(&mut buf, 1, 3);
        assert_eq!(buf[0], 8.0);

        // trapezoid mean divides by n - 1
        let mut buf = [2.0, 4.0, 6.0];
        composite_mean_trapezoid(&mut buf, 1, 3);
        assert_eq!(buf[0], 4.0);
    }

    #[test]
    fn test_multicomponent_interleave() {
        // two components, two samples
        let mut buf = [1.0, 10.0, 3.0, 30.0];
        composite_mean(&mut buf, 2, 2);
        assert_eq!(&buf[..2], &[2.0, 20.0]);
    }

    #[test]
    fn test_row_mean_matches_point() {
        let samples = [[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let mut acc = [0.0; 2];
        let row = select_row_composite(SlabMode::Mean, false);
        for (i, s) in samples.iter().enumerate() {
            row(&mut acc, s, i, 3);
        }
        assert_eq!(acc, [3.0, 4.0]);
    }

    #[test]
    fn test_row_min_max() {
        let samples = [[5.0], [-1.0], [3.0]];
        let mut lo = [0.0];
        let mut hi = [0.0];
        for (i, s) in samples.iter().enumerate() {
            row_min(&mut lo, s, i, 3);
            row_max(&mut hi, s, i, 3);
        }
        assert_eq!(lo[0], -1.0);
        assert_eq!(hi[0], 5.0);
    }
}
