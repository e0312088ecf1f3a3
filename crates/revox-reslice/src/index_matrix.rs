//! Construction and classification of the output-index to input-index matrix.
//!
//! The engine folds as much of the voxel mapping as possible into one 4x4:
//! output index -> output world -> reslice axes -> (homogeneous transform)
//! -> input world -> input index. When the reslice transform is nonlinear
//! only the first two stages fold; the rest runs per voxel as a residual.

use revox_core::image::ImageInfo;
use revox_core::spatial::{floor_frac, Direction3, Extent, Matrix4d};
use revox_core::transform::PointTransform;

/// The per-pass mapping snapshot.
#[derive(Debug, Clone, Copy)]
pub(crate) struct IndexTransform {
    pub matrix: Matrix4d,
    /// True when a nonlinear residual must run per voxel after the matrix.
    pub nonlinear: bool,
}

/// Output index -> output world matrix.
fn output_index_matrix(info: &ImageInfo) -> Matrix4d {
    let mut m = Matrix4d::identity();
    for i in 0..3 {
        for j in 0..3 {
            m[(i, j)] = info.direction[(i, j)] * info.spacing[j];
        }
        m[(i, 3)] = info.origin[i];
    }
    m
}

/// Input world -> input index matrix.
fn input_index_matrix(info: &ImageInfo) -> Matrix4d {
    let inv = info
        .direction
        .try_inverse()
        .unwrap_or_else(Direction3::identity);
    let mut m = Matrix4d::identity();
    for i in 0..3 {
        let mut t = 0.0;
        for j in 0..3 {
            m[(i, j)] = inv[(i, j)] / info.spacing[i];
            t -= inv[(i, j)] * info.origin[j] / info.spacing[i];
        }
        m[(i, 3)] = t;
    }
    m
}

fn geometry_matches(a: &ImageInfo, b: &ImageInfo) -> bool {
    a.direction == b.direction && a.spacing == b.spacing && a.origin == b.origin
}

fn is_default_geometry(info: &ImageInfo) -> bool {
    info.direction == Direction3::identity()
        && info.spacing == [1.0; 3]
        && info.origin == [0.0; 3]
}

/// Compose the index matrix for one pass.
pub(crate) fn build_index_matrix(
    axes: Option<&Matrix4d>,
    transform: Option<&dyn PointTransform>,
    input: &ImageInfo,
    output: &ImageInfo,
) -> IndexTransform {
    let mut combined = axes.copied().unwrap_or_else(Matrix4d::identity);
    let mut nonlinear = false;
    if let Some(t) = transform {
        match t.as_matrix() {
            Some(h) => combined = h * combined,
            None => nonlinear = true,
        }
    }

    // skip the concatenations entirely for a pure identity mapping
    let mut identity = is_identity_matrix(&combined);
    if identity {
        identity = if nonlinear {
            is_default_geometry(output)
        } else {
            geometry_matches(input, output)
        };
    }

    if !identity {
        combined *= output_index_matrix(output);
        if !nonlinear {
            combined = input_index_matrix(input) * combined;
        }
    }

    IndexTransform {
        matrix: combined,
        nonlinear,
    }
}

/// Exact identity test.
pub(crate) fn is_identity_matrix(m: &Matrix4d) -> bool {
    *m == Matrix4d::identity()
}

/// Permutation + scale + translation: bottom row `(0,0,0,1)` and exactly one
/// non-zero entry per column of the upper-left 3x3.
pub(crate) fn is_permutation_matrix(m: &Matrix4d) -> bool {
    for i in 0..3 {
        if m[(3, i)] != 0.0 {
            return false;
        }
    }
    if m[(3, 3)] != 1.0 {
        return false;
    }
    for j in 0..3 {
        let nonzero = (0..3).filter(|&i| m[(i, j)] != 0.0).count();
        if nonzero != 1 {
            return false;
        }
    }
    true
}

/// Whether sampling through a permutation matrix always lands on the input
/// grid, so nearest-neighbor reproduces any interpolator's result.
pub(crate) fn can_use_nearest(m: &Matrix4d, out_ext: &Extent) -> bool {
    for i in 0..3 {
        let Some(j) = (0..3).find(|&j| m[(i, j)] != 0.0) else {
            return false;
        };
        let mut x = m[(i, j)];
        let mut y = m[(i, 3)];
        if out_ext.min(j) == out_ext.max(j) {
            // a single-slice axis contributes one fixed term
            y += x * f64::from(out_ext.min(i));
            x = 0.0;
        }
        if floor_frac(x).1 != 0.0 || floor_frac(y).1 != 0.0 {
            return false;
        }
    }
    true
}

/// The nonlinear remainder of the voxel mapping: the point transform
/// followed by the input world-to-index map.
pub(crate) struct Residual<'a> {
    transform: &'a dyn PointTransform,
    origin: [f64; 3],
    /// Inverse direction rows divided by the input spacing.
    inv: [[f64; 3]; 3],
}

impl<'a> Residual<'a> {
    pub fn new(transform: &'a dyn PointTransform, input: &ImageInfo) -> Self {
        let dir_inv = input
            .direction
            .try_inverse()
            .unwrap_or_else(Direction3::identity);
        let mut inv = [[0.0; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                inv[i][j] = dir_inv[(i, j)] / input.spacing[i];
            }
        }
        Self {
            transform,
            origin: input.origin,
            inv,
        }
    }

    /// Warp a world point and convert it to a continuous input index.
    #[inline]
    pub fn apply(&self, p: [f64; 3]) -> [f64; 3] {
        let q = self.transform.forward(p);
        let x = q[0] - self.origin[0];
        let y = q[1] - self.origin[1];
        let z = q[2] - self.origin[2];
        [
            self.inv[0][0] * x + self.inv[0][1] * y + self.inv[0][2] * z,
            self.inv[1][0] * x + self.inv[1][1] * y + self.inv[1][2] * z,
            self.inv[2][0] * x + self.inv[2][1] * y + self.inv[2][2] * z,
        ]
    }
}
