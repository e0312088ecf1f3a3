//! Resampling of 3D scalar images onto arbitrarily posed voxel grids.
//!
//! [`ImageReslice`] maps every output voxel through the composition of the
//! output index-to-world transform, a rigid "reslice axes" placement, an
//! optional point transform and the input world-to-index transform, samples
//! the input through a pluggable interpolator, optionally composites a slab
//! of parallel samples, and converts the result to the output scalar kind.
//! Axis-aligned mappings take a tabulated fast path; execution is split into
//! tiles across threads.

pub mod error;
pub mod filter;

mod composite;
mod convert;
mod driver;
mod execute;
mod geometry;
mod index_matrix;
mod permute;

pub use driver::{ReslicePass, ResliceOutput, SplitMode, StencilRun};
pub use error::{ResliceError, Result};
pub use filter::{ImageReslice, SlabMode};
