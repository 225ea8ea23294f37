//! Spatial value types for points, vectors and voxel spacing.
//!
//! All types are thin wrappers around nalgebra. Components are always stored
//! in field axis order (slowest-varying axis first), the order produced once
//! at ingestion and kept everywhere after.

pub mod point;
pub mod vector;
pub mod spacing;

pub use point::Point;
pub use vector::Vector;
pub use spacing::Spacing;
