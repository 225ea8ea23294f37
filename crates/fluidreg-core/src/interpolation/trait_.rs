//! Interpolator trait for sampling values at continuous coordinates.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;

/// Samples a 3-D volume at continuous index positions.
///
/// Positions outside the grid are clamped to the border, so every query
/// yields a finite value.
pub trait Interpolator<B: Backend> {
    /// Interpolate `data` at the given positions.
    ///
    /// # Arguments
    /// * `data` - Source volume `[N0, N1, N2]`
    /// * `coords` - Continuous indices along axes 0, 1 and 2, each `[Batch]`
    ///
    /// # Returns
    /// Sampled values `[Batch]`
    fn sample(&self, data: &Tensor<B, 3>, coords: [Tensor<B, 1>; 3]) -> Tensor<B, 1>;
}
