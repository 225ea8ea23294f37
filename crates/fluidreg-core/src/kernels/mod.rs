//! Whole-volume tensor kernels.
//!
//! Every kernel here operates on `Tensor<B, 3>` buffers that live on the
//! backend device; no host round-trip happens inside a kernel.

pub mod grid;
pub mod gradient;
pub mod gaussian;
pub mod resize;
pub mod warp;

pub use grid::{identity_mapping, index_grid};
pub use gradient::{axis_derivative, gradient};
pub use gaussian::{recursive_gaussian, smooth, YvvCoefficients};
pub use resize::resize;
pub use warp::warp;

use std::panic::{catch_unwind, AssertUnwindSafe};

use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor};

use crate::error::{FieldError, Result};

/// Check that the device can execute a trivial reduction.
///
/// Backends report missing adapters or driver failures by panicking; the
/// panic is caught here and turned into `CapabilityUnavailable`.
pub fn probe_device<B: Backend>(device: &B::Device) -> Result<()> {
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        Tensor::<B, 1>::ones([4], device)
            .sum()
            .into_scalar()
            .elem::<f32>()
    }));

    match outcome {
        Ok(total) if (total - 4.0).abs() < 1e-3 => {
            tracing::debug!(backend = B::name(device), "device probe succeeded");
            Ok(())
        }
        Ok(total) => Err(FieldError::capability_unavailable(format!(
            "device probe returned {} instead of 4",
            total
        ))),
        Err(_) => Err(FieldError::capability_unavailable(format!(
            "backend {} failed to execute on the selected device",
            B::name(device)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn test_probe_cpu_device() {
        let device = Default::default();
        assert!(probe_device::<B>(&device).is_ok());
    }
}
