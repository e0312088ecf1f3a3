//! Spatial types: voxel extents, direction matrices and rounding helpers.
//!
//! All matrix and vector types are based on nalgebra for efficient linear
//! algebra operations.

pub mod direction;
pub mod extent;
pub mod round;

pub use direction::Direction3;
pub use extent::Extent;
pub use round::{floor_frac, round, FLOOR_TOL};

pub type Matrix3d = nalgebra::Matrix3<f64>;
pub type Matrix4d = nalgebra::Matrix4<f64>;
pub type Vector3d = nalgebra::Vector3<f64>;
pub type Vector4d = nalgebra::Vector4<f64>;
