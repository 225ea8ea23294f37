use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};

use crate::field::FieldGeometry;

/// Integer index of every voxel along each axis, as floats.
///
/// Component `k` holds `i_k` at position `(i_0, i_1, i_2)`.
pub fn index_grid<B: Backend>(shape: [usize; 3], device: &B::Device) -> [Tensor<B, 3>; 3] {
    let [n0, n1, n2] = shape;

    let axis = |n: usize, view: [usize; 3], times: [usize; 3]| {
        Tensor::<B, 1, Int>::arange(0..n as i64, device)
            .float()
            .reshape(view)
            .repeat(&times)
    };

    [
        axis(n0, [n0, 1, 1], [1, n1, n2]),
        axis(n1, [1, n1, 1], [n0, 1, n2]),
        axis(n2, [1, 1, n2], [n0, n1, 1]),
    ]
}

/// Identity mapping `h_k(i) = i_k * spacing_k` for the given grid.
pub fn identity_mapping<B: Backend>(geometry: &FieldGeometry, device: &B::Device) -> [Tensor<B, 3>; 3] {
    let spacing = geometry.spacing();
    let [g0, g1, g2] = index_grid::<B>(geometry.shape(), device);
    [
        g0.mul_scalar(spacing[0]),
        g1.mul_scalar(spacing[1]),
        g2.mul_scalar(spacing[2]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::{Point, Spacing};
    use burn_ndarray::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn test_index_grid_values() {
        let device = Default::default();
        let [g0, g1, g2] = index_grid::<B>([2, 3, 4], &device);
        assert_eq!(g0.dims(), [2, 3, 4]);

        let v0 = g0.into_data().to_vec::<f32>().unwrap();
        let v1 = g1.into_data().to_vec::<f32>().unwrap();
        let v2 = g2.into_data().to_vec::<f32>().unwrap();

        // Flat index of (1, 2, 3) is 1*12 + 2*4 + 3
        let at = 12 + 8 + 3;
        assert_eq!(v0[at], 1.0);
        assert_eq!(v1[at], 2.0);
        assert_eq!(v2[at], 3.0);
        assert_eq!(v2[1], 1.0);
        assert_eq!(v1[4], 1.0);
    }

    #[test]
    fn test_identity_mapping_scales_by_spacing() {
        let device = Default::default();
        let geometry = FieldGeometry::new(
            [2, 2, 2],
            Spacing::new([2.0, 3.0, 0.5]),
            Point::new([10.0, 10.0, 10.0]),
        )
        .unwrap();
        let [h0, h1, h2] = identity_mapping::<B>(&geometry, &device);
        let last = 7;
        assert_eq!(h0.into_data().to_vec::<f32>().unwrap()[last], 2.0);
        assert_eq!(h1.into_data().to_vec::<f32>().unwrap()[last], 3.0);
        assert_eq!(h2.into_data().to_vec::<f32>().unwrap()[last], 0.5);
    }
}
