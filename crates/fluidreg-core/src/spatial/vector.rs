//! Vector type for displacements, forces and per-axis quantities.

use nalgebra::SVector;
use serde::{Deserialize, Serialize};

/// A vector in D-dimensional space.
///
/// Used for spacing, force vectors drawn by the operator and local image
/// gradients sampled on the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector<const D: usize>(pub SVector<f64, D>);

impl<const D: usize> Vector<D> {
    /// Create a new vector from components.
    pub fn new(components: [f64; D]) -> Self {
        Self(SVector::from(components))
    }

    /// Create a zero vector.
    pub fn zeros() -> Self {
        Self(SVector::zeros())
    }

    /// Components as a plain array.
    pub fn to_array(&self) -> [f64; D] {
        let mut out = [0.0; D];
        for (i, v) in out.iter_mut().enumerate() {
            *v = self.0[i];
        }
        out
    }

    /// Euclidean length.
    pub fn norm(&self) -> f64 {
        self.0.norm()
    }

    /// Dot product.
    pub fn dot(&self, other: &Self) -> f64 {
        self.0.dot(&other.0)
    }

    /// Unit vector in the same direction, or `None` for the zero vector.
    pub fn try_normalize(&self) -> Option<Self> {
        let n = self.norm();
        if n == 0.0 {
            None
        } else {
            Some(Self(self.0 / n))
        }
    }

    /// Reverse component order.
    ///
    /// Only used at the host boundary where native (width, height, depth)
    /// ordering meets field axis ordering.
    pub fn reversed(&self) -> Self {
        let mut out = Self::zeros();
        for i in 0..D {
            out.0[i] = self.0[D - 1 - i];
        }
        out
    }
}

impl<const D: usize> std::ops::Index<usize> for Vector<D> {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<const D: usize> std::ops::IndexMut<usize> for Vector<D> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl<const D: usize> std::ops::Add for Vector<D> {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self(self.0 + other.0)
    }
}

impl<const D: usize> std::ops::Sub for Vector<D> {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self(self.0 - other.0)
    }
}

impl<const D: usize> std::ops::Mul<f64> for Vector<D> {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self::Output {
        Self(self.0 * scalar)
    }
}
