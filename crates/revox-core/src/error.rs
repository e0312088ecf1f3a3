//! Error types shared by the core containers.

use thiserror::Error;

/// Main error type for core container operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A pixel buffer could not be allocated.
    #[error("allocation of {bytes} bytes failed")]
    Allocation { bytes: usize },

    /// Buffer length does not match the extent and component count.
    #[error("buffer length mismatch: expected {expected} elements, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// A matrix that must be invertible was singular.
    #[error("singular matrix: {0}")]
    SingularMatrix(String),

    /// Invalid argument to a core operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Create an invalid-argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a singular-matrix error.
    pub fn singular_matrix(msg: impl Into<String>) -> Self {
        Self::SingularMatrix(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::Allocation { bytes: 1024 };
        assert_eq!(err.to_string(), "allocation of 1024 bytes failed");

        let err = CoreError::invalid_argument("bad extent");
        assert!(matches!(err, CoreError::InvalidArgument(_)));
    }
}
