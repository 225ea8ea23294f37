//! Dense deformation field with absolute sample coordinates.
//!
//! Each grid position stores the physical coordinate it pulls its value
//! from, not a displacement. Warping a volume samples it at those
//! coordinates; composing two fields resamples one mapping through the
//! other.

use burn::tensor::backend::Backend;

use crate::error::{FieldError, Result};
use crate::field::{FieldGeometry, VolumetricField};
use crate::interpolation::LinearInterpolator;
use crate::kernels;

/// Pull-back mapping `h = (h0, h1, h2)` over a reference grid.
///
/// All three components share the grid's shape.
#[derive(Debug, Clone)]
pub struct DeformationField<B: Backend> {
    grid: FieldGeometry,
    components: [VolumetricField<B>; 3],
    interpolator: LinearInterpolator,
}

impl<B: Backend> DeformationField<B> {
    /// Identity mapping on the grid of `reference`.
    ///
    /// The reference may be an empty holder; only its geometry is used.
    pub fn new(reference: &VolumetricField<B>) -> Self {
        Self::identity(*reference.geometry(), reference.device())
    }

    /// Identity mapping: every position maps to its own physical coordinate.
    pub fn identity(grid: FieldGeometry, device: &B::Device) -> Self {
        let components =
            kernels::identity_mapping::<B>(&grid, device).map(|h| VolumetricField::derived_from(grid, h, device));
        Self {
            grid,
            components,
            interpolator: LinearInterpolator::new(),
        }
    }

    /// Mapping with explicit components on the grid of `reference`.
    ///
    /// # Arguments
    /// * `reference` - Field defining the grid
    /// * `components` - Absolute coordinates along axes 0, 1 and 2
    pub fn from_components(reference: &VolumetricField<B>, components: [VolumetricField<B>; 3]) -> Result<Self> {
        let grid = *reference.geometry();
        Self::check_components(&grid, &components)?;
        Ok(Self {
            grid,
            components,
            interpolator: LinearInterpolator::new(),
        })
    }

    fn check_components(grid: &FieldGeometry, components: &[VolumetricField<B>; 3]) -> Result<()> {
        for c in components {
            grid.ensure_same_shape(c.geometry())?;
            if !c.is_allocated() {
                return Err(FieldError::unallocated("deformation component"));
            }
        }
        Ok(())
    }

    pub fn grid(&self) -> &FieldGeometry {
        &self.grid
    }

    pub fn components(&self) -> &[VolumetricField<B>; 3] {
        &self.components
    }

    /// Replace all three components.
    pub fn set_mapping(&mut self, components: [VolumetricField<B>; 3]) -> Result<()> {
        Self::check_components(&self.grid, &components)?;
        self.components = components;
        Ok(())
    }

    /// One explicit Euler step: `h_i += v_i`.
    ///
    /// Velocities must already be scaled to a safe step size.
    pub fn add_velocity(&mut self, velocity: &[VolumetricField<B>; 3]) -> Result<()> {
        for v in velocity {
            self.grid.ensure_same_shape(v.geometry())?;
        }
        let updated = [
            self.components[0].add(&velocity[0])?,
            self.components[1].add(&velocity[1])?,
            self.components[2].add(&velocity[2])?,
        ];
        self.components = updated;
        Ok(())
    }

    /// Largest Euclidean norm of the stored coordinate vectors.
    pub fn max_magnitude(&self) -> Result<f64> {
        let [h0, h1, h2] = &self.components;
        let squared = h0.multiply(h0)?.add(&h1.multiply(h1)?)?.add(&h2.multiply(h2)?)?;
        Ok((squared.max()? as f64).max(0.0).sqrt())
    }

    /// Pull-back warp: `result(x) = field(h(x))`, on this field's grid.
    pub fn apply_to(&self, field: &VolumetricField<B>) -> Result<VolumetricField<B>> {
        let source = field.data()?;
        let [h0, h1, h2] = &self.components;
        let warped = kernels::warp(
            &self.interpolator,
            source,
            field.spacing(),
            [h0.data()?, h1.data()?, h2.data()?],
        );
        h0.clone_empty().with_data(warped)
    }

    /// Resample this mapping through `other`: `new(x) = self(other(x))`.
    ///
    /// The result lives on `other`'s grid. The order matters: this is the
    /// semi-Lagrangian accumulation step, not `other(self(x))`.
    pub fn compose(&self, other: &DeformationField<B>) -> Result<DeformationField<B>> {
        let components = [
            other.apply_to(&self.components[0])?,
            other.apply_to(&self.components[1])?,
            other.apply_to(&self.components[2])?,
        ];
        Ok(Self {
            grid: other.grid,
            components,
            interpolator: self.interpolator,
        })
    }

    /// Resample all components to `target` voxels.
    ///
    /// Stored coordinates are physical, so values carry over unchanged.
    pub fn resample(&self, target: [usize; 3]) -> Result<DeformationField<B>> {
        let grid = self.grid.resized(target)?;
        let components = [
            self.components[0].resample(target)?,
            self.components[1].resample(target)?,
            self.components[2].resample(target)?,
        ];
        Ok(Self {
            grid,
            components,
            interpolator: self.interpolator,
        })
    }
}
