//! World to moving-volume index mapping.

use fluidreg_core::field::HostVolume;
use fluidreg_core::spatial::Point;
use nalgebra::{Matrix4, Vector4};

use crate::error::{RegistrationError, Result};

/// Maps world positions to continuous indices of the moving volume.
///
/// Indices are returned in field axis order.
pub trait IndexMapper: Send + Sync {
    fn world_to_index(&self, world: &Point<3>) -> Result<Point<3>>;
}

/// Homogeneous affine world to native-index transform.
#[derive(Debug, Clone, PartialEq)]
pub struct AffineIndexMap {
    world_to_native: Matrix4<f64>,
}

impl AffineIndexMap {
    /// Wrap a world to native (i, j, k) matrix.
    pub fn new(world_to_native: Matrix4<f64>) -> Self {
        Self { world_to_native }
    }

    /// Invert an index to world matrix.
    pub fn from_index_to_world(index_to_world: &Matrix4<f64>) -> Result<Self> {
        index_to_world
            .try_inverse()
            .map(Self::new)
            .ok_or_else(|| RegistrationError::coordinate_transform("index to world matrix is singular"))
    }

    /// Mapping for a host volume.
    pub fn for_volume(volume: &HostVolume) -> Result<Self> {
        Self::from_index_to_world(&volume.index_to_world)
    }

    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.world_to_native
    }
}

impl IndexMapper for AffineIndexMap {
    fn world_to_index(&self, world: &Point<3>) -> Result<Point<3>> {
        let p = self.world_to_native * Vector4::new(world[0], world[1], world[2], 1.0);
        if p[3].abs() < f64::EPSILON || !p.iter().all(|v| v.is_finite()) {
            return Err(RegistrationError::coordinate_transform(format!(
                "world position {:?} has no finite index",
                world.to_array()
            )));
        }
        let native = Point::new([p[0] / p[3], p[1] / p[3], p[2] / p[3]]);
        Ok(native.reversed())
    }
}
