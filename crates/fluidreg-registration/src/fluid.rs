//! One iteration of steered viscous-fluid registration.
//!
//! The iteration drives the output towards the fixed volume with the SSD
//! force, optionally adds one operator impulse, regularises the force with
//! two Gaussian scales and accumulates the resulting velocity into the total
//! deformation by semi-Lagrangian composition.

use burn::tensor::backend::Backend;
use fluidreg_core::spatial::Point;
use fluidreg_core::{DeformationField, VolumetricField};

use crate::config::FluidConfig;
use crate::error::Result;
use crate::interaction::{InteractionEvent, InteractionQueue};
use crate::mapping::IndexMapper;
use crate::metric::sum_squared_difference;
use crate::session::{CommittedStep, SessionContext};
use crate::splat::{splat_impulse, SplatSummary};

/// Smoothing parameters of the fluid regulariser.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluidParams {
    pub viscosity: f64,
    pub small_sigma: f64,
    pub large_sigma: f64,
}

impl From<&FluidConfig> for FluidParams {
    fn from(config: &FluidConfig) -> Self {
        Self {
            viscosity: config.viscosity,
            small_sigma: config.small_sigma,
            large_sigma: config.large_sigma,
        }
    }
}

impl Default for FluidParams {
    fn default() -> Self {
        Self::from(&FluidConfig::default())
    }
}

/// A stroke applied during an iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedImpulse {
    pub event: InteractionEvent,
    /// Stroke start in moving-volume index space, field axis order.
    pub start_index: Point<3>,
    pub end_index: Point<3>,
    pub summary: SplatSummary,
}

/// What one iteration did.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// Session iteration count after this step.
    pub iteration: usize,
    /// Largest regularised velocity before scaling.
    pub max_velocity: f64,
    /// Scale applied to the velocity this step.
    pub step_scale: f64,
    /// Stored step scale for the next iteration.
    pub fluid_delta: f64,
    /// Stroke consumed this step, if any.
    pub impulse: Option<AppliedImpulse>,
    /// SSD between fixed and output after the step.
    pub similarity: f64,
    /// False when the velocity vanished and nothing changed.
    pub updated: bool,
}

/// Largest pointwise Euclidean norm of a vector field.
pub fn max_vector_norm<B: Backend>(v: &[VolumetricField<B>; 3]) -> Result<f64> {
    let squared = v[0]
        .multiply(&v[0])?
        .add(&v[1].multiply(&v[1])?)?
        .add(&v[2].multiply(&v[2])?)?;
    Ok((squared.max()? as f64).max(0.0).sqrt())
}

/// Two-scale fluid regularisation: `G_small * m + viscosity * G_large * m`.
pub fn regularize<B: Backend>(momentum: &VolumetricField<B>, params: &FluidParams) -> Result<VolumetricField<B>> {
    let detail = momentum.gaussian(params.small_sigma)?;
    let mut viscous = momentum.gaussian(params.large_sigma)?;
    viscous.scale(params.viscosity)?;
    Ok(detail.add(&viscous)?)
}

/// Next step scale.
///
/// Recalibrates to `1 / max_velocity` when unset or when the stored scale
/// would move any sample by more than one unit.
pub fn adapt_step(fluid_delta: f64, max_velocity: f64) -> f64 {
    if fluid_delta == 0.0 || fluid_delta * max_velocity > 1.0 {
        1.0 / max_velocity
    } else {
        fluid_delta
    }
}

/// Run one iteration on `session`, draining at most one stroke from `queue`.
///
/// Nothing in the session changes unless the whole iteration succeeds. A
/// stroke taken from the queue is consumed even when the iteration later
/// fails.
pub fn fluid_update<B: Backend>(
    session: &mut SessionContext<B>,
    queue: &InteractionQueue,
    mapper: &dyn IndexMapper,
    params: &FluidParams,
) -> Result<StepReport> {
    let fixed = session.fixed();
    let output = session.output();

    let diff = fixed.subtract(output)?;
    let gradient = output.gradient()?;
    let mut momentum = [
        gradient[0].multiply(&diff)?,
        gradient[1].multiply(&diff)?,
        gradient[2].multiply(&diff)?,
    ];

    let mut impulse = None;
    if let Some(event) = queue.pop() {
        match (
            mapper.world_to_index(&event.start_world),
            mapper.world_to_index(&event.end_world),
        ) {
            (Ok(start), Ok(end)) => {
                let summary = splat_impulse(&mut momentum, &gradient, &start, &end)?;
                tracing::debug!(
                    timestamp = event.timestamp,
                    drag = ?event.world_drag().to_array(),
                    start = ?start.to_array(),
                    end = ?end.to_array(),
                    modified = summary.modified,
                    "applied stroke"
                );
                impulse = Some(AppliedImpulse {
                    event,
                    start_index: start,
                    end_index: end,
                    summary,
                });
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(timestamp = event.timestamp, error = %e, "stroke skipped");
            }
        }
    }

    let mut velocity = [
        regularize(&momentum[0], params)?,
        regularize(&momentum[1], params)?,
        regularize(&momentum[2], params)?,
    ];

    let max_velocity = max_vector_norm(&velocity)?;
    if !(max_velocity > 0.0) || !max_velocity.is_finite() {
        tracing::debug!(max_velocity, "velocity vanished, iteration skipped");
        let fluid_delta = session.fluid_delta();
        session.record_idle_iteration(fluid_delta);
        return Ok(StepReport {
            iteration: session.iteration(),
            max_velocity,
            step_scale: 0.0,
            fluid_delta,
            impulse,
            similarity: session.similarity().unwrap_or(f64::NAN),
            updated: false,
        });
    }

    let step_scale = adapt_step(session.fluid_delta(), max_velocity);
    for v in velocity.iter_mut() {
        v.scale(step_scale)?;
    }
    // Strokes can be far stronger than the image force
    let fluid_delta = if impulse.is_some() { 0.0 } else { step_scale };

    let mut increment = DeformationField::new(fixed);
    increment.add_velocity(&velocity)?;
    let total = session.total_deformation().compose(&increment)?;
    let warped = total.apply_to(session.moving())?;
    let similarity = sum_squared_difference(fixed, &warped)?;

    let step = CommittedStep::new(total, warped, fluid_delta, similarity)?;
    session.commit(step);

    tracing::debug!(
        iteration = session.iteration(),
        max_velocity,
        step_scale,
        similarity,
        "fluid iteration"
    );

    Ok(StepReport {
        iteration: session.iteration(),
        max_velocity,
        step_scale,
        fluid_delta,
        impulse,
        similarity,
        updated: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapt_step_initialises() {
        assert_eq!(adapt_step(0.0, 4.0), 0.25);
    }

    #[test]
    fn test_adapt_step_keeps_stable_scale() {
        assert_eq!(adapt_step(0.1, 4.0), 0.1);
    }

    #[test]
    fn test_adapt_step_shrinks_unstable_scale() {
        assert_eq!(adapt_step(0.5, 4.0), 0.25);
    }

    #[test]
    fn test_params_from_config() {
        let params = FluidParams::from(&FluidConfig::default().with_viscosity(2.0));
        assert_eq!(params.viscosity, 2.0);
        assert_eq!(params.small_sigma, 5.0);
        assert_eq!(params.large_sigma, 15.0);
    }
}
