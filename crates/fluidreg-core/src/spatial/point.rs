//! Point type for positions in physical or continuous index space.

use nalgebra::Point as NaPoint;
use serde::{Deserialize, Serialize};
use super::Vector;

/// A point in D-dimensional space.
///
/// Field origins and continuous voxel indices are both stored as points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point<const D: usize>(pub NaPoint<f64, D>);

impl<const D: usize> Point<D> {
    /// Create a new point from coordinates.
    pub fn new(coords: [f64; D]) -> Self {
        Self(NaPoint::from(coords))
    }

    /// The point with all coordinates zero.
    pub fn origin() -> Self {
        Self(NaPoint::origin())
    }

    /// Coordinates as a plain array.
    pub fn to_array(&self) -> [f64; D] {
        let mut out = [0.0; D];
        for (i, v) in out.iter_mut().enumerate() {
            *v = self.0.coords[i];
        }
        out
    }

    /// Nearest integer lattice position (round half away from zero).
    pub fn round(&self) -> [i64; D] {
        let mut out = [0i64; D];
        for (i, v) in out.iter_mut().enumerate() {
            *v = self.0.coords[i].round() as i64;
        }
        out
    }

    /// Reverse coordinate order (host boundary only).
    pub fn reversed(&self) -> Self {
        let mut out = Self::origin();
        for i in 0..D {
            out.0.coords[i] = self.0.coords[D - 1 - i];
        }
        out
    }
}

impl<const D: usize> std::ops::Index<usize> for Point<D> {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0.coords[index]
    }
}

impl<const D: usize> std::ops::Sub for Point<D> {
    type Output = Vector<D>;

    fn sub(self, other: Self) -> Self::Output {
        Vector(self.0.coords - other.0.coords)
    }
}
