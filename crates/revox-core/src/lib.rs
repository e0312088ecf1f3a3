pub mod error;
pub mod image;
pub mod interpolation;
pub mod mtime;
pub mod spatial;
pub mod stencil;
pub mod transform;

pub use error::{CoreError, Result};
pub use image::{Image, ImageInfo, Scalar, ScalarBuffer, ScalarKind};
pub use mtime::ModifiedTime;
pub use spatial::{Direction3, Extent};
pub use stencil::ImageStencil;
