use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::interpolation::Interpolator;
use crate::spatial::Spacing;

/// Sample `source` at the physical positions held in `mapping`.
///
/// Physical positions are converted to continuous source indices by
/// dividing by the source spacing. The output takes the shape of the
/// mapping components.
pub fn warp<B: Backend, I: Interpolator<B>>(
    interpolator: &I,
    source: &Tensor<B, 3>,
    source_spacing: &Spacing<3>,
    mapping: [&Tensor<B, 3>; 3],
) -> Tensor<B, 3> {
    let shape = mapping[0].dims();
    let count = shape.iter().product::<usize>();

    let coords = [0, 1, 2].map(|k| {
        mapping[k]
            .clone()
            .reshape([count])
            .div_scalar(source_spacing[k])
    });

    interpolator.sample(source, coords).reshape(shape)
}
