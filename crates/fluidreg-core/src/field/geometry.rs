//! Grid geometry shared by every field on the same lattice.

use crate::error::{FieldError, Result};
use crate::spatial::{Point, Spacing};

/// Shape, spacing and origin of a 3-D sample grid.
///
/// Axis order is field order: `shape[0]` is the slowest-varying axis of the
/// sample buffer. Spacing and origin follow the same order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldGeometry {
    shape: [usize; 3],
    spacing: Spacing<3>,
    origin: Point<3>,
}

impl FieldGeometry {
    /// Create a geometry, rejecting empty axes and non-positive spacing.
    pub fn new(shape: [usize; 3], spacing: Spacing<3>, origin: Point<3>) -> Result<Self> {
        if shape.iter().any(|&n| n == 0) {
            return Err(FieldError::invalid_geometry(format!(
                "every axis needs at least one sample, got {:?}",
                shape
            )));
        }
        if !spacing.is_valid() {
            return Err(FieldError::invalid_geometry(format!(
                "spacing must be finite and positive, got {:?}",
                spacing.to_array()
            )));
        }
        Ok(Self {
            shape,
            spacing,
            origin,
        })
    }

    /// Unit spacing, zero origin.
    pub fn with_shape(shape: [usize; 3]) -> Result<Self> {
        Self::new(shape, Spacing::uniform(1.0), Point::origin())
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn spacing(&self) -> &Spacing<3> {
        &self.spacing
    }

    pub fn origin(&self) -> &Point<3> {
        &self.origin
    }

    /// Number of samples in the grid.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether an integer position lies inside the grid.
    pub fn contains(&self, index: [i64; 3]) -> bool {
        (0..3).all(|d| index[d] >= 0 && (index[d] as usize) < self.shape[d])
    }

    /// Geometry of the same physical extent resampled to `target`.
    pub fn resized(&self, target: [usize; 3]) -> Result<Self> {
        if target.iter().any(|&n| n == 0) {
            return Err(FieldError::invalid_geometry(format!(
                "resample target must be non-empty, got {:?}",
                target
            )));
        }
        Self::new(target, self.spacing.rescaled(self.shape, target), self.origin)
    }

    /// Fail with `ShapeMismatch` unless `other` has the same shape.
    pub fn ensure_same_shape(&self, other: &FieldGeometry) -> Result<()> {
        if self.shape != other.shape {
            return Err(FieldError::shape_mismatch(self.shape, other.shape));
        }
        Ok(())
    }
}
