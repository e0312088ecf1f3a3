//! Interpolation interfaces and the default kernel set.
//!
//! The object-safe [`Interpolator`] trait is what the resampling engine
//! programs against; separable kernels additionally expose the
//! [`SeparableWeights`] capability that enables per-axis weight
//! precomputation.

pub mod kernel;
pub mod source;
pub mod trait_;
pub mod weights;

pub use kernel::ImageInterpolator;
pub use source::SourceView;
pub use trait_::{Interpolator, SeparableWeights};
pub use weights::WeightsTable;

/// Kernel selection for [`ImageInterpolator`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InterpolationMode {
    #[default]
    Nearest,
    Linear,
    Cubic,
}

impl InterpolationMode {
    /// Nominal kernel footprint along one axis.
    pub fn support_size(self) -> i32 {
        match self {
            InterpolationMode::Nearest => 1,
            InterpolationMode::Linear => 2,
            InterpolationMode::Cubic => 4,
        }
    }
}

impl std::fmt::Display for InterpolationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InterpolationMode::Nearest => "NearestNeighbor",
            InterpolationMode::Linear => "Linear",
            InterpolationMode::Cubic => "Cubic",
        };
        write!(f, "{name}")
    }
}

/// How out-of-extent sample taps are resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BorderMode {
    /// Taps clamp to the nearest edge voxel.
    #[default]
    Clamp,
    /// Taps wrap around periodically.
    Repeat,
    /// Taps reflect at the edges, with the edge sample repeated.
    Mirror,
}

impl std::fmt::Display for BorderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BorderMode::Clamp => "Clamp",
            BorderMode::Repeat => "Repeat",
            BorderMode::Mirror => "Mirror",
        };
        write!(f, "{name}")
    }
}
