use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::grid::index_grid;
use crate::interpolation::{Interpolator, LinearInterpolator};

/// Resample a volume to `target` voxels per axis.
///
/// Target index `t` reads source index `t * old / new` with trilinear
/// interpolation, so the first voxel of both grids coincides.
pub fn resize<B: Backend>(data: &Tensor<B, 3>, target: [usize; 3]) -> Tensor<B, 3> {
    let source = data.dims();
    if source == target {
        return data.clone();
    }
    let count = target.iter().product::<usize>();
    let grid = index_grid::<B>(target, &data.device());

    let mut k = 0;
    let coords = grid.map(|g| {
        let ratio = source[k] as f64 / target[k] as f64;
        k += 1;
        g.reshape([count]).mul_scalar(ratio)
    });

    LinearInterpolator::new().sample(data, coords).reshape(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn test_downsample_by_two() {
        let device = Default::default();
        let values: Vec<f32> = (0..8).map(|i| i as f32).collect();
        let data = Tensor::<B, 3>::from_data(TensorData::new(values, [1, 1, 8]), &device);
        let out = resize(&data, [1, 1, 4]).into_data().to_vec::<f32>().unwrap();
        assert_eq!(out, vec![0.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_upsample_interpolates() {
        let device = Default::default();
        let data = Tensor::<B, 3>::from_data(TensorData::new(vec![0.0f32, 2.0], [2, 1, 1]), &device);
        let out = resize(&data, [4, 1, 1]).into_data().to_vec::<f32>().unwrap();
        // Source positions 0, 0.5, 1, 1.5 with the last clamped
        assert_eq!(out, vec![0.0, 1.0, 2.0, 2.0]);
    }

    #[test]
    fn test_same_shape_is_identity() {
        let device = Default::default();
        let data = Tensor::<B, 3>::from_data(TensorData::new(vec![1.0f32, 5.0, 3.0], [3, 1, 1]), &device);
        let out = resize(&data, [3, 1, 1]).into_data().to_vec::<f32>().unwrap();
        assert_eq!(out, vec![1.0, 5.0, 3.0]);
    }
}
