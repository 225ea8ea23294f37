//! Error types for registration sessions.
//!
//! Numerical singularities met during an iteration (flat images, zero
//! velocity, gradients orthogonal to a stroke) are absorbed by skipping the
//! affected update and never appear here.

use fluidreg_core::FieldError;
use thiserror::Error;

/// Main error type for registration operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistrationError {
    /// Error raised by a field or deformation operation.
    #[error("Field error: {0}")]
    Field(#[from] FieldError),

    /// Fixed and moving inputs, or session fields, disagree in shape.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Operation not valid in the current session state.
    #[error("Session state error: {0}")]
    SessionState(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A world position could not be mapped into index space.
    #[error("Coordinate transform error: {0}")]
    CoordinateTransform(String),

    /// No usable compute device; raised before any session state exists.
    #[error("Compute capability unavailable: {0}")]
    CapabilityUnavailable(String),
}

/// Result type for registration operations.
pub type Result<T> = std::result::Result<T, RegistrationError>;

impl RegistrationError {
    /// Create a shape mismatch error.
    pub fn shape_mismatch(expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }

    /// Create a session state error.
    pub fn session_state(msg: impl Into<String>) -> Self {
        Self::SessionState(msg.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a coordinate transform error.
    pub fn coordinate_transform(msg: impl Into<String>) -> Self {
        Self::CoordinateTransform(msg.into())
    }

    /// Create a capability error.
    pub fn capability_unavailable(msg: impl Into<String>) -> Self {
        Self::CapabilityUnavailable(msg.into())
    }

    /// Lift a field error, keeping device failures distinguishable.
    pub fn from_field(err: FieldError) -> Self {
        match err {
            FieldError::CapabilityUnavailable(msg) => Self::CapabilityUnavailable(msg),
            other => Self::Field(other),
        }
    }
}
