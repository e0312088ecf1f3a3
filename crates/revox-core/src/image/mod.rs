//! Image container and typed pixel storage.
//!
//! Images carry a voxel extent, physical metadata (spacing, origin, direction
//! cosines) and an interleaved, X-fastest scalar buffer with one of eight
//! runtime-selected numeric kinds.

pub mod buffer;
pub mod scalar;

mod container;

pub use buffer::ScalarBuffer;
pub use container::{Image, ImageInfo};
pub use scalar::{Scalar, ScalarKind};
