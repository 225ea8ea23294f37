use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::spatial::Spacing;

/// Finite-difference derivative along one axis, divided by `step`.
///
/// Central differences inside, one-sided differences on the two border
/// planes. Axes shorter than two voxels have a zero derivative.
pub fn axis_derivative<B: Backend>(data: &Tensor<B, 3>, axis: usize, step: f64) -> Tensor<B, 3> {
    let n = data.dims()[axis];
    if n < 2 {
        return data.zeros_like();
    }

    let forward = data.clone().narrow(axis, 1, n - 1) - data.clone().narrow(axis, 0, n - 1);

    let mut parts = Vec::with_capacity(3);
    parts.push(forward.clone().narrow(axis, 0, 1));
    if n > 2 {
        let central = (forward.clone().narrow(axis, 1, n - 2) + forward.clone().narrow(axis, 0, n - 2))
            .mul_scalar(0.5);
        parts.push(central);
    }
    parts.push(forward.narrow(axis, n - 2, 1));

    Tensor::cat(parts, axis).div_scalar(step)
}

/// Spatial gradient, one component per axis.
pub fn gradient<B: Backend>(data: &Tensor<B, 3>, spacing: &Spacing<3>) -> [Tensor<B, 3>; 3] {
    [
        axis_derivative(data, 0, spacing[0]),
        axis_derivative(data, 1, spacing[1]),
        axis_derivative(data, 2, spacing[2]),
    ]
}
