//! Error types for reslice operations.

use thiserror::Error;

/// Main error type for the reslice engine.
#[derive(Error, Debug)]
pub enum ResliceError {
    /// A parameter was rejected at set time.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The pipeline input cannot be resampled.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The output image handed to a tile does not match the pass.
    #[error("output mismatch: {0}")]
    OutputMismatch(String),

    /// Buffer allocation failed; partial outputs are abandoned.
    #[error(transparent)]
    Core(#[from] revox_core::CoreError),
}

/// Result type for reslice operations.
pub type Result<T> = std::result::Result<T, ResliceError>;

impl ResliceError {
    /// Create an invalid-parameter error.
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Create an invalid-input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an output-mismatch error.
    pub fn output_mismatch(msg: impl Into<String>) -> Self {
        Self::OutputMismatch(msg.into())
    }
}
