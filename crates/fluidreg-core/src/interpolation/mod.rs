//! Sampling of fields at continuous index positions.

pub mod trait_;
pub mod linear;

pub use trait_::Interpolator;
pub use linear::LinearInterpolator;
