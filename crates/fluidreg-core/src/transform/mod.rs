//! Spatial mappings between grids.

pub mod deformation_field;

pub use deformation_field::DeformationField;
