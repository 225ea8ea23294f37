//! Device-resident volumetric primitives for fluid image registration.
//!
//! Fields are generic over a `burn` backend. Tests and CPU runs use
//! `burn-ndarray`; the `wgpu` feature enables the GPU backend.

pub mod error;
pub mod field;
pub mod interpolation;
pub mod kernels;
pub mod spatial;
pub mod transform;

pub use error::{FieldError, Result};
pub use field::{FieldGeometry, HostVolume, VolumetricField};
pub use interpolation::{Interpolator, LinearInterpolator};
pub use kernels::probe_device;
pub use spatial::{Point, Spacing, Vector};
pub use transform::DeformationField;
