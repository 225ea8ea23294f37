//! Scalar volumes, their grid geometry and the host boundary.

pub mod geometry;
pub mod host;
pub mod volume;

pub use geometry::FieldGeometry;
pub use host::HostVolume;
pub use volume::VolumetricField;
