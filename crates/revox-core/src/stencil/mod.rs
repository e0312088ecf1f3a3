//! Run-length binary voxel masks.
//!
//! A stencil stores, for every `(y, z)` row of its extent, an ordered list of
//! inclusive `[x_lo, x_hi]` runs marking the voxels that are inside the mask.

use crate::spatial::Extent;

/// A run-length encoded binary voxel mask.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageStencil {
    extent: Extent,
    rows: Vec<Vec<(i32, i32)>>,
}

impl ImageStencil {
    /// An empty stencil covering `extent`.
    pub fn new(extent: Extent) -> Self {
        let rows = vec![Vec::new(); extent.size(1) * extent.size(2)];
        Self { extent, rows }
    }

    pub fn extent(&self) -> &Extent {
        &self.extent
    }

    fn row_index(&self, y: i32, z: i32) -> Option<usize> {
        if y < self.extent.min(1)
            || y > self.extent.max(1)
            || z < self.extent.min(2)
            || z > self.extent.max(2)
        {
            return None;
        }
        let ny = self.extent.size(1);
        Some((z - self.extent.min(2)) as usize * ny + (y - self.extent.min(1)) as usize)
    }

    /// The in-mask runs of row `(y, z)`, in ascending x order.
    ///
    /// Rows outside the stencil extent have no runs.
    pub fn runs(&self, y: i32, z: i32) -> &[(i32, i32)] {
        match self.row_index(y, z) {
            Some(idx) => &self.rows[idx],
            None => &[],
        }
    }

    /// Append a run at the tail of row `(y, z)`.
    ///
    /// Runs of one row must be inserted in ascending x order; rows outside
    /// the extent are ignored. Empty runs (`x_hi < x_lo`) are dropped.
    pub fn insert_run(&mut self, x_lo: i32, x_hi: i32, y: i32, z: i32) {
        if x_hi < x_lo {
            return;
        }
        if let Some(idx) = self.row_index(y, z) {
            let row = &mut self.rows[idx];
            debug_assert!(row.last().map_or(true, |&(_, prev_hi)| prev_hi < x_lo));
            row.push((x_lo, x_hi));
        }
    }

    /// True when voxel `(x, y, z)` is inside the mask.
    pub fn contains(&self, x: i32, y: i32, z: i32) -> bool {
        self.runs(y, z)
            .iter()
            .any(|&(lo, hi)| x >= lo && x <= hi)
    }

    /// Walk row `(y, z)` over `[x_min, x_max]` as alternating segments.
    ///
    /// The yielded segments are disjoint, ordered, and cover the requested
    /// range exactly; each carries whether it lies inside the mask.
    pub fn spans(&self, y: i32, z: i32, x_min: i32, x_max: i32) -> SpanIter<'_> {
        SpanIter {
            runs: self.runs(y, z),
            cursor: x_min,
            x_max,
        }
    }
}

/// One segment of a row walk: `[x_lo, x_hi]` and whether it is in the mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub x_lo: i32,
    pub x_hi: i32,
    pub inside: bool,
}

/// Iterator produced by [`ImageStencil::spans`].
pub struct SpanIter<'a> {
    runs: &'a [(i32, i32)],
    cursor: i32,
    x_max: i32,
}

impl Iterator for SpanIter<'_> {
    type Item = Span;

    fn next(&mut self) -> Option<Span> {
        if self.cursor > self.x_max {
            return None;
        }
        // skip runs that end before the cursor
        while let Some(&(_, hi)) = self.runs.first() {
            if hi < self.cursor {
                self.runs = &self.runs[1..];
            } else {
                break;
            }
        }
        let span = match self.runs.first() {
            Some(&(lo, hi)) if lo <= self.cursor => Span {
                x_lo: self.cursor,
                x_hi: hi.min(self.x_max),
                inside: true,
            },
            Some(&(lo, _)) => Span {
                x_lo: self.cursor,
                x_hi: (lo - 1).min(self.x_max),
                inside: false,
            },
            None => Span {
                x_lo: self.cursor,
                x_hi: self.x_max,
                inside: false,
            },
        };
        self.cursor = span.x_hi + 1;
        Some(span)
    }
}
