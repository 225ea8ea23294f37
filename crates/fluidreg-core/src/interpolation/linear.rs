//! Trilinear interpolation.

use burn::tensor::{Int, Tensor};
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use super::trait_::Interpolator;

/// Trilinear interpolator with border clamping.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LinearInterpolator;

impl LinearInterpolator {
    pub fn new() -> Self {
        Self
    }

    #[inline]
    fn gather<B: Backend>(
        flat_data: &Tensor<B, 1>,
        i0: &Tensor<B, 1, Int>,
        i1: &Tensor<B, 1, Int>,
        i2: &Tensor<B, 1, Int>,
        stride0: i32,
        stride1: i32,
    ) -> Tensor<B, 1> {
        let idx = i0.clone() * stride0 + i1.clone() * stride1 + i2.clone();
        flat_data.clone().gather(0, idx)
    }
}

/// Floor, upper neighbour and fractional weight along one axis.
fn bracket<B: Backend>(c: Tensor<B, 1>, n: usize) -> (Tensor<B, 1, Int>, Tensor<B, 1, Int>, Tensor<B, 1>) {
    let hi = (n - 1) as f64;
    let lower = c.clone().floor();
    let weight = c - lower.clone();
    let upper = lower.clone() + 1.0;
    (
        lower.clamp(0.0, hi).int(),
        upper.clamp(0.0, hi).int(),
        weight,
    )
}

impl<B: Backend> Interpolator<B> for LinearInterpolator {
    fn sample(&self, data: &Tensor<B, 3>, coords: [Tensor<B, 1>; 3]) -> Tensor<B, 1> {
        let [n0, n1, n2] = data.dims();
        let [c0, c1, c2] = coords;

        let (a0, b0, w0) = bracket(c0, n0);
        let (a1, b1, w1) = bracket(c1, n1);
        let (a2, b2, w2) = bracket(c2, n2);

        let stride0 = (n1 * n2) as i32;
        let stride1 = n2 as i32;
        let flat_data = data.clone().reshape([n0 * n1 * n2]);

        let v000 = Self::gather(&flat_data, &a0, &a1, &a2, stride0, stride1);
        let v001 = Self::gather(&flat_data, &a0, &a1, &b2, stride0, stride1);
        let v010 = Self::gather(&flat_data, &a0, &b1, &a2, stride0, stride1);
        let v011 = Self::gather(&flat_data, &a0, &b1, &b2, stride0, stride1);
        let v100 = Self::gather(&flat_data, &b0, &a1, &a2, stride0, stride1);
        let v101 = Self::gather(&flat_data, &b0, &a1, &b2, stride0, stride1);
        let v110 = Self::gather(&flat_data, &b0, &b1, &a2, stride0, stride1);
        let v111 = Self::gather(&flat_data, &b0, &b1, &b2, stride0, stride1);

        let r0 = w0.ones_like() - w0.clone();
        let r1 = w1.ones_like() - w1.clone();
        let r2 = w2.ones_like() - w2.clone();

        // Innermost axis first
        let c00 = v000 * r2.clone() + v001 * w2.clone();
        let c01 = v010 * r2.clone() + v011 * w2.clone();
        let c10 = v100 * r2.clone() + v101 * w2.clone();
        let c11 = v110 * r2 + v111 * w2;

        let c0 = c00 * r1.clone() + c01 * w1.clone();
        let c1 = c10 * r1 + c11 * w1;

        c0 * r0 + c1 * w0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;

    type B = NdArray<f32>;

    fn ramp_volume(device: &<B as Backend>::Device) -> Tensor<B, 3> {
        // value = 100*i0 + 10*i1 + i2
        let mut values = Vec::with_capacity(27);
        for i in 0..3 {
            for j in 0..3 {
                for k in 0..3 {
                    values.push((100 * i + 10 * j + k) as f32);
                }
            }
        }
        Tensor::from_data(TensorData::new(values, [3, 3, 3]), device)
    }

    fn coords(device: &<B as Backend>::Device, points: &[[f32; 3]]) -> [Tensor<B, 1>; 3] {
        let axis = |a: usize| {
            let v: Vec<f32> = points.iter().map(|p| p[a]).collect();
            let n = v.len();
            Tensor::<B, 1>::from_data(TensorData::new(v, [n]), device)
        };
        [axis(0), axis(1), axis(2)]
    }

    #[test]
    fn test_linear_interpolation_at_grid_points() {
        let device = Default::default();
        let data = ramp_volume(&device);
        let result = LinearInterpolator::new()
            .sample(&data, coords(&device, &[[0.0, 0.0, 0.0], [1.0, 2.0, 1.0], [2.0, 2.0, 2.0]]));
        let values = result.into_data().to_vec::<f32>().unwrap();
        assert!((values[0] - 0.0).abs() < 1e-5);
        assert!((values[1] - 121.0).abs() < 1e-5);
        assert!((values[2] - 222.0).abs() < 1e-5);
    }

    #[test]
    fn test_linear_interpolation_is_separable() {
        let device = Default::default();
        let data = ramp_volume(&device);
        let result = LinearInterpolator::new()
            .sample(&data, coords(&device, &[[0.5, 0.0, 0.0], [0.0, 1.5, 0.25], [1.5, 0.5, 1.5]]));
        let values = result.into_data().to_vec::<f32>().unwrap();
        assert!((values[0] - 50.0).abs() < 1e-4, "axis 0 half-step, got {}", values[0]);
        assert!((values[1] - 15.25).abs() < 1e-4, "axes 1/2, got {}", values[1]);
        assert!((values[2] - 156.5).abs() < 1e-4, "all axes, got {}", values[2]);
    }

    #[test]
    fn test_linear_interpolation_clamps_outside() {
        let device = Default::default();
        let data = ramp_volume(&device);
        let result = LinearInterpolator::new()
            .sample(&data, coords(&device, &[[-1.0, 0.0, 0.0], [5.0, 2.0, 2.0]]));
        let values = result.into_data().to_vec::<f32>().unwrap();
        assert!((values[0] - 0.0).abs() < 1e-5);
        assert!((values[1] - 222.0).abs() < 1e-5);
    }
}
