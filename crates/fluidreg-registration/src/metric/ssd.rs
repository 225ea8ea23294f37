//! Sum of squared differences.

use burn::tensor::backend::Backend;
use burn::tensor::ElementConversion;
use fluidreg_core::VolumetricField;

use crate::error::{RegistrationError, Result};

/// `sum((a - b)^2)` over all voxels, reduced on the device.
pub fn sum_squared_difference<B: Backend>(a: &VolumetricField<B>, b: &VolumetricField<B>) -> Result<f64> {
    if a.shape() != b.shape() {
        return Err(RegistrationError::shape_mismatch(&a.shape(), &b.shape()));
    }
    let diff = a.data()?.clone() - b.data()?.clone();
    Ok((diff.clone() * diff).sum().into_scalar().elem::<f64>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use fluidreg_core::FieldGeometry;

    type B = NdArray<f32>;

    #[test]
    fn test_ssd() {
        let device = Default::default();
        let geometry = FieldGeometry::with_shape([1, 2, 2]).unwrap();
        let a = VolumetricField::<B>::from_samples(vec![0.0, 1.0, 2.0, 3.0], geometry, &device).unwrap();
        let b = VolumetricField::<B>::from_samples(vec![1.0, 1.0, 0.0, 3.0], geometry, &device).unwrap();
        assert!((sum_squared_difference(&a, &b).unwrap() - 5.0).abs() < 1e-9);
        assert_eq!(sum_squared_difference(&a, &a).unwrap(), 0.0);
    }

    #[test]
    fn test_ssd_shape_mismatch() {
        let device = Default::default();
        let a = VolumetricField::<B>::zeros(FieldGeometry::with_shape([1, 2, 2]).unwrap(), &device);
        let b = VolumetricField::<B>::zeros(FieldGeometry::with_shape([2, 2, 2]).unwrap(), &device);
        assert!(matches!(
            sum_squared_difference(&a, &b),
            Err(RegistrationError::ShapeMismatch { .. })
        ));
    }
}
