//! Mutable state of one registration session.

use burn::tensor::backend::Backend;
use fluidreg_core::spatial::Point;
use fluidreg_core::{DeformationField, VolumetricField};

use crate::error::{RegistrationError, Result};

/// Fields, accumulated deformation and step state of a running session.
///
/// The output always lives on the fixed grid. The moving field may use a
/// different grid; warping resamples it.
#[derive(Debug, Clone)]
pub struct SessionContext<B: Backend> {
    fixed: VolumetricField<B>,
    moving: VolumetricField<B>,
    output: VolumetricField<B>,
    output_gradient: VolumetricField<B>,
    total: DeformationField<B>,
    fluid_delta: f64,
    iteration: usize,
    similarity: Option<f64>,
    normalize_inputs: bool,
}

impl<B: Backend> SessionContext<B> {
    /// Build a session with an identity deformation.
    pub fn new(fixed: VolumetricField<B>, moving: VolumetricField<B>, normalize_inputs: bool) -> Result<Self> {
        let fixed = Self::prepare(fixed, normalize_inputs)?;
        let moving = Self::prepare(moving, normalize_inputs)?;
        let total = DeformationField::new(&fixed);
        let output = total.apply_to(&moving)?;
        let output_gradient = Self::grab_field(&output)?;

        Ok(Self {
            fixed,
            moving,
            output,
            output_gradient,
            total,
            fluid_delta: 0.0,
            iteration: 0,
            similarity: None,
            normalize_inputs,
        })
    }

    fn prepare(mut field: VolumetricField<B>, normalize: bool) -> Result<VolumetricField<B>> {
        if !field.is_allocated() {
            return Err(RegistrationError::session_state("input volume has no samples"));
        }
        if normalize {
            field.normalize()?;
        }
        Ok(field)
    }

    /// Gradient magnitude divided by its maximum, used to decide where
    /// strokes may start. Flat regions stay at zero.
    fn grab_field(output: &VolumetricField<B>) -> Result<VolumetricField<B>> {
        let mut magnitude = output.gradient_magnitude()?;
        let max = magnitude.max()?;
        if max > 0.0 {
            magnitude.scale(1.0 / max as f64)?;
        }
        Ok(magnitude)
    }

    pub fn fixed(&self) -> &VolumetricField<B> {
        &self.fixed
    }

    pub fn moving(&self) -> &VolumetricField<B> {
        &self.moving
    }

    pub fn output(&self) -> &VolumetricField<B> {
        &self.output
    }

    /// Gradient magnitude of the output, scaled into [0, 1].
    pub fn output_gradient_magnitude(&self) -> &VolumetricField<B> {
        &self.output_gradient
    }

    pub fn total_deformation(&self) -> &DeformationField<B> {
        &self.total
    }

    pub fn fluid_delta(&self) -> f64 {
        self.fluid_delta
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// SSD after the last committed iteration.
    pub fn similarity(&self) -> Option<f64> {
        self.similarity
    }

    /// Replace the fixed volume. The deformation restarts on the new grid.
    pub fn set_fixed(&mut self, fixed: VolumetricField<B>) -> Result<()> {
        self.fixed = Self::prepare(fixed, self.normalize_inputs)?;
        self.reset()
    }

    /// Replace the moving volume and re-warp it through the current deformation.
    pub fn set_moving(&mut self, moving: VolumetricField<B>) -> Result<()> {
        let moving = Self::prepare(moving, self.normalize_inputs)?;
        let output = self.total.apply_to(&moving)?;
        let output_gradient = Self::grab_field(&output)?;
        self.moving = moving;
        self.output = output;
        self.output_gradient = output_gradient;
        Ok(())
    }

    /// Replace the current output estimate. Must lie on the fixed grid.
    pub fn set_output(&mut self, output: VolumetricField<B>) -> Result<()> {
        if output.shape() != self.fixed.shape() {
            return Err(RegistrationError::shape_mismatch(&self.fixed.shape(), &output.shape()));
        }
        self.output_gradient = Self::grab_field(&output)?;
        self.output = output;
        Ok(())
    }

    /// Identity deformation, zero step scale, output re-warped from moving.
    pub fn reset(&mut self) -> Result<()> {
        let total = DeformationField::new(&self.fixed);
        let output = total.apply_to(&self.moving)?;
        let output_gradient = Self::grab_field(&output)?;
        self.total = total;
        self.output = output;
        self.output_gradient = output_gradient;
        self.fluid_delta = 0.0;
        self.iteration = 0;
        self.similarity = None;
        Ok(())
    }

    /// Grab strength at a continuous index; zero outside the grid.
    pub fn grab_magnitude(&self, index: &Point<3>) -> Result<f32> {
        let voxel = index.round();
        if !self.output_gradient.geometry().contains(voxel) {
            return Ok(0.0);
        }
        let voxel = voxel.map(|v| v as usize);
        Ok(self.output_gradient.value_at(voxel)?)
    }

    /// Install the results of a completed iteration.
    pub(crate) fn commit(&mut self, update: CommittedStep<B>) {
        self.total = update.total;
        self.output = update.output;
        self.output_gradient = update.output_gradient;
        self.fluid_delta = update.fluid_delta;
        self.similarity = Some(update.similarity);
        self.iteration += 1;
    }

    /// Count an iteration that left the fields unchanged.
    pub(crate) fn record_idle_iteration(&mut self, fluid_delta: f64) {
        self.fluid_delta = fluid_delta;
        self.iteration += 1;
    }
}

/// Everything one iteration changes, computed before any of it is applied.
#[derive(Debug)]
pub(crate) struct CommittedStep<B: Backend> {
    pub total: DeformationField<B>,
    pub output: VolumetricField<B>,
    pub output_gradient: VolumetricField<B>,
    pub fluid_delta: f64,
    pub similarity: f64,
}

impl<B: Backend> CommittedStep<B> {
    pub fn new(total: DeformationField<B>, output: VolumetricField<B>, fluid_delta: f64, similarity: f64) -> Result<Self> {
        let output_gradient = SessionContext::<B>::grab_field(&output)?;
        Ok(Self {
            total,
            output,
            output_gradient,
            fluid_delta,
            similarity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use fluidreg_core::{FieldGeometry, Spacing};

    type B = NdArray<f32>;

    fn ramp(shape: [usize; 3], scale: f32) -> VolumetricField<B> {
        let device = Default::default();
        let geometry = FieldGeometry::with_shape(shape).unwrap();
        let samples = (0..geometry.len()).map(|i| scale * i as f32).collect();
        VolumetricField::from_samples(samples, geometry, &device).unwrap()
    }

    #[test]
    fn test_new_session_normalizes_and_warps() {
        let session = SessionContext::new(ramp([2, 3, 4], 2.0), ramp([2, 3, 4], 5.0), true).unwrap();
        assert_eq!(session.fixed().max().unwrap(), 1.0);
        assert_eq!(session.moving().max().unwrap(), 1.0);
        assert_eq!(session.fluid_delta(), 0.0);
        assert_eq!(session.iteration(), 0);

        let out = session.output().to_vec().unwrap();
        let moving = session.moving().to_vec().unwrap();
        for (a, b) in out.iter().zip(moving) {
            assert!((a - b).abs() < 1e-6);
        }
        assert!((session.output_gradient_magnitude().max().unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_moving_on_other_grid_is_resampled() {
        let device = Default::default();
        let coarse = FieldGeometry::new([1, 1, 2], Spacing::new([1.0, 1.0, 3.0]), Point::origin()).unwrap();
        let moving = VolumetricField::<B>::from_samples(vec![0.0, 3.0], coarse, &device).unwrap();
        let fixed = ramp([1, 1, 4], 1.0);
        let session = SessionContext::new(fixed, moving, false).unwrap();
        assert_eq!(session.output().shape(), [1, 1, 4]);
        let expected = [0.0, 1.0, 2.0, 3.0];
        for (a, b) in session.output().to_vec().unwrap().iter().zip(expected) {
            assert!((a - b).abs() < 1e-5, "expected {}, got {}", b, a);
        }
    }

    #[test]
    fn test_set_output_checks_grid() {
        let mut session = SessionContext::new(ramp([2, 2, 2], 1.0), ramp([2, 2, 2], 1.0), false).unwrap();
        assert!(session.set_output(ramp([2, 2, 3], 1.0)).is_err());
        assert!(session.set_output(ramp([2, 2, 2], 3.0)).is_ok());
        assert_eq!(session.output().max().unwrap(), 21.0);
    }

    #[test]
    fn test_reset_restores_identity() {
        let mut session = SessionContext::new(ramp([2, 2, 2], 1.0), ramp([2, 2, 2], 1.0), false).unwrap();
        session.set_output(ramp([2, 2, 2], 0.0)).unwrap();
        session.record_idle_iteration(0.5);
        session.reset().unwrap();
        assert_eq!(session.fluid_delta(), 0.0);
        assert_eq!(session.iteration(), 0);
        assert_eq!(session.output().to_vec().unwrap(), session.moving().to_vec().unwrap());
    }

    #[test]
    fn test_set_moving_rewarps() {
        let mut session = SessionContext::new(ramp([1, 1, 4], 1.0), ramp([1, 1, 4], 1.0), false).unwrap();
        session.set_moving(ramp([1, 1, 4], 2.0)).unwrap();
        assert_eq!(session.output().to_vec().unwrap(), vec![0.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_grab_magnitude_outside_is_zero() {
        let session = SessionContext::new(ramp([2, 2, 2], 1.0), ramp([2, 2, 2], 1.0), false).unwrap();
        assert_eq!(session.grab_magnitude(&Point::new([5.0, 0.0, 0.0])).unwrap(), 0.0);
        assert!(session.grab_magnitude(&Point::new([0.2, 0.9, 1.1])).unwrap() > 0.0);
    }

    #[test]
    fn test_unallocated_input_is_rejected() {
        let fixed = ramp([2, 2, 2], 1.0);
        let empty = fixed.clone_empty();
        assert!(SessionContext::new(fixed, empty, true).is_err());
    }
}
