//! Rounding helpers with a shared snap tolerance.
//!
//! Extent analysis, matrix classification, weight precomputation and the
//! per-voxel loops must all agree on how a continuous index becomes an
//! integer one; they all route through these two functions.

/// Values this close below an integer are snapped up to it (2^-17).
pub const FLOOR_TOL: f64 = 7.62939453125e-06;

/// Floor with the snap tolerance applied.
///
/// Returns the integer part and the remaining fraction. A value within the
/// tolerance below an integer counts as that integer and yields a fraction
/// of exactly zero, as does an exact integer.
#[inline]
pub fn floor_frac(x: f64) -> (i64, f64) {
    let f = (x + FLOOR_TOL).floor();
    let frac = x - f;
    (f as i64, if frac > 0.0 { frac } else { 0.0 })
}

/// Round half up, with the same snap tolerance as [`floor_frac`].
#[inline]
pub fn round(x: f64) -> i64 {
    floor_frac(x + 0.5).0
}
