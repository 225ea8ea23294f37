#![allow(dead_code)]

use burn_ndarray::NdArray;
use fluidreg_core::field::{FieldGeometry, VolumetricField};

pub type B = NdArray<f32>;

/// Gaussian blob on a unit-spacing grid, indices in field order.
pub fn blob(shape: [usize; 3], center: [f32; 3], sigma: f32) -> VolumetricField<B> {
    let device = Default::default();
    let mut samples = Vec::with_capacity(shape.iter().product());
    for i in 0..shape[0] {
        for j in 0..shape[1] {
            for k in 0..shape[2] {
                let d2 = (i as f32 - center[0]).powi(2)
                    + (j as f32 - center[1]).powi(2)
                    + (k as f32 - center[2]).powi(2);
                samples.push((-d2 / (2.0 * sigma * sigma)).exp());
            }
        }
    }
    let geometry = FieldGeometry::with_shape(shape).unwrap();
    VolumetricField::from_samples(samples, geometry, &device).unwrap()
}
