//! Host-side volume descriptor and the ingest/emit boundary.
//!
//! Host volumes use the native (width, height, depth) axis order with width
//! varying fastest. Fields use the reverse order, so a sample buffer can be
//! shared without transposition: only the metadata triples are reversed.

use burn::tensor::backend::Backend;
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

use super::geometry::FieldGeometry;
use super::volume::VolumetricField;
use crate::error::{FieldError, Result};
use crate::spatial::{Point, Spacing};

/// A displayable volume owned by the host application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostVolume {
    /// Native dimensions (width, height, depth).
    pub dimensions: [usize; 3],
    /// Native spacing.
    pub spacing: [f64; 3],
    /// Native origin.
    pub origin: [f64; 3],
    /// Scalar components per voxel.
    pub components: usize,
    /// Homogeneous native-index to world transform.
    pub index_to_world: Matrix4<f64>,
    /// Samples, width fastest.
    pub scalars: Vec<f32>,
}

impl HostVolume {
    /// Single-component volume with unit spacing and an identity transform.
    pub fn new(dimensions: [usize; 3], scalars: Vec<f32>) -> Self {
        Self {
            dimensions,
            spacing: [1.0; 3],
            origin: [0.0; 3],
            components: 1,
            index_to_world: Matrix4::identity(),
            scalars,
        }
    }

    /// Set spacing and origin, and derive a matching axis-aligned transform.
    pub fn with_spacing_origin(mut self, spacing: [f64; 3], origin: [f64; 3]) -> Self {
        let mut m = Matrix4::identity();
        for k in 0..3 {
            m[(k, k)] = spacing[k];
            m[(k, 3)] = origin[k];
        }
        self.spacing = spacing;
        self.origin = origin;
        self.index_to_world = m;
        self
    }

    pub fn with_index_to_world(mut self, matrix: Matrix4<f64>) -> Self {
        self.index_to_world = matrix;
        self
    }

    /// Voxel count implied by the dimensions.
    pub fn voxel_count(&self) -> usize {
        self.dimensions.iter().product()
    }

    /// Field-order geometry of this volume.
    pub fn field_geometry(&self) -> Result<FieldGeometry> {
        let reversed = |a: [f64; 3]| [a[2], a[1], a[0]];
        let [w, h, d] = self.dimensions;
        FieldGeometry::new(
            [d, h, w],
            Spacing::new(reversed(self.spacing)),
            Point::new(reversed(self.origin)),
        )
    }
}

impl<B: Backend> VolumetricField<B> {
    /// Build a field from a host volume, reversing the axis order.
    pub fn ingest(source: &HostVolume, device: &B::Device) -> Result<Self> {
        if source.components != 1 {
            return Err(FieldError::invalid_source(format!(
                "expected a single scalar component, found {}",
                source.components
            )));
        }
        if source.scalars.len() != source.voxel_count() {
            return Err(FieldError::invalid_source(format!(
                "{} scalars for dimensions {:?}",
                source.scalars.len(),
                source.dimensions
            )));
        }
        let geometry = source.field_geometry()?;
        tracing::debug!(shape = ?geometry.shape(), "ingesting host volume");
        Self::from_samples(source.scalars.clone(), geometry, device)
    }

    /// Write the samples back into a host volume of matching shape.
    pub fn emit(&self, target: &mut HostVolume) -> Result<()> {
        let [w, h, d] = target.dimensions;
        if [d, h, w] != self.shape() {
            return Err(FieldError::shape_mismatch(self.shape(), [d, h, w]));
        }
        target.scalars = self.to_vec()?;
        target.components = 1;
        Ok(())
    }
}
