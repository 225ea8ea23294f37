//! Error types for field and deformation operations.

use thiserror::Error;

/// Errors raised by volumetric field operations.
///
/// Numerical singularities (constant fields, zero gradients) are not errors;
/// operations absorb them locally.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    /// Operands of an elementwise operation have different shapes.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: [usize; 3],
        actual: [usize; 3],
    },

    /// The field was created by `clone_empty` and has no sample buffer.
    #[error("Field has no allocated buffer: {0}")]
    Unallocated(String),

    /// The external volume cannot supply a single-component scalar array.
    #[error("Invalid source volume: {0}")]
    InvalidSource(String),

    /// Shape or spacing out of range.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// No usable compute device.
    #[error("Compute capability unavailable: {0}")]
    CapabilityUnavailable(String),
}

/// Result type for field operations.
pub type Result<T> = std::result::Result<T, FieldError>;

impl FieldError {
    pub fn shape_mismatch(expected: [usize; 3], actual: [usize; 3]) -> Self {
        Self::ShapeMismatch { expected, actual }
    }

    pub fn unallocated(op: impl Into<String>) -> Self {
        Self::Unallocated(op.into())
    }

    pub fn invalid_source(msg: impl Into<String>) -> Self {
        Self::InvalidSource(msg.into())
    }

    pub fn invalid_geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }

    pub fn capability_unavailable(msg: impl Into<String>) -> Self {
        Self::CapabilityUnavailable(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_display() {
        let err = FieldError::shape_mismatch([4, 4, 4], [2, 4, 4]);
        let s = err.to_string();
        assert!(s.contains("expected [4, 4, 4]"));
        assert!(s.contains("got [2, 4, 4]"));
    }

    #[test]
    fn test_unallocated_display() {
        let err = FieldError::unallocated("normalize");
        assert_eq!(err.to_string(), "Field has no allocated buffer: normalize");
    }
}
