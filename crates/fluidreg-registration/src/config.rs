//! Session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RegistrationError, Result};
use crate::interaction::BacklogPolicy;

/// Parameters of a steered fluid registration session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FluidConfig {
    /// Weight of the large-scale smoothing term.
    pub viscosity: f64,
    /// Physical sigma of the detail smoothing.
    pub small_sigma: f64,
    /// Physical sigma of the viscous smoothing.
    pub large_sigma: f64,
    /// Delay between scheduled iterations.
    pub interval: Duration,
    /// Stop scheduling after this many iterations.
    pub max_iterations: Option<usize>,
    /// Rescale fixed and moving inputs to [0, 1] at session start.
    pub normalize_inputs: bool,
    /// Depth policy of the interaction queue.
    pub backlog: BacklogPolicy,
    /// Minimum normalised gradient magnitude under the cursor to grab.
    pub grab_threshold: f32,
}

impl Default for FluidConfig {
    fn default() -> Self {
        Self {
            viscosity: 50.0,
            small_sigma: 5.0,
            large_sigma: 15.0,
            interval: Duration::from_millis(1000),
            max_iterations: None,
            normalize_inputs: true,
            backlog: BacklogPolicy::Unbounded,
            grab_threshold: 0.01,
        }
    }
}

impl FluidConfig {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the viscosity.
    pub fn with_viscosity(mut self, viscosity: f64) -> Self {
        self.viscosity = viscosity;
        self
    }

    /// Set both smoothing scales.
    pub fn with_sigmas(mut self, small: f64, large: f64) -> Self {
        self.small_sigma = small;
        self.large_sigma = large;
        self
    }

    /// Set the delay between iterations.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Cap the number of iterations.
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = Some(iterations);
        self
    }

    /// Keep input intensities as ingested.
    pub fn without_normalization(mut self) -> Self {
        self.normalize_inputs = false;
        self
    }

    /// Set the queue depth policy.
    pub fn with_backlog(mut self, backlog: BacklogPolicy) -> Self {
        self.backlog = backlog;
        self
    }

    /// Set the grab threshold.
    pub fn with_grab_threshold(mut self, threshold: f32) -> Self {
        self.grab_threshold = threshold;
        self
    }

    /// Check every parameter range.
    pub fn validate(&self) -> Result<()> {
        validate_viscosity(self.viscosity)?;
        validate_sigma("small_sigma", self.small_sigma)?;
        validate_sigma("large_sigma", self.large_sigma)?;

        if self.interval.is_zero() {
            return Err(RegistrationError::invalid_configuration(
                "Iteration interval must be positive",
            ));
        }
        if let Some(iterations) = self.max_iterations {
            validate_iterations(iterations)?;
        }
        if let BacklogPolicy::DropOldest(0) = self.backlog {
            return Err(RegistrationError::invalid_configuration(
                "Backlog capacity must be at least 1",
            ));
        }
        if !self.grab_threshold.is_finite() || self.grab_threshold < 0.0 {
            return Err(RegistrationError::invalid_configuration(format!(
                "Grab threshold must be non-negative, got {}",
                self.grab_threshold
            )));
        }
        Ok(())
    }
}

/// Validate viscosity.
pub fn validate_viscosity(viscosity: f64) -> Result<()> {
    if !viscosity.is_finite() || viscosity < 0.0 {
        return Err(RegistrationError::invalid_configuration(format!(
            "Viscosity must be non-negative, got {}",
            viscosity
        )));
    }
    Ok(())
}

/// Validate a smoothing scale.
pub fn validate_sigma(name: &str, sigma: f64) -> Result<()> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(RegistrationError::invalid_configuration(format!(
            "{} must be positive, got {}",
            name, sigma
        )));
    }
    Ok(())
}

/// Validate iteration count.
pub fn validate_iterations(iterations: usize) -> Result<()> {
    if iterations == 0 {
        return Err(RegistrationError::invalid_configuration(
            "Iterations must be positive",
        ));
    }

    if iterations > 1_000_000 {
        return Err(RegistrationError::invalid_configuration(format!(
            "Iterations too large: {}",
            iterations
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = FluidConfig::default();
        assert_eq!(config.viscosity, 50.0);
        assert_eq!(config.interval, Duration::from_millis(1000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = FluidConfig::new()
            .with_viscosity(0.0)
            .with_sigmas(1.0, 3.0)
            .with_interval(Duration::from_millis(5))
            .with_max_iterations(10)
            .without_normalization()
            .with_backlog(BacklogPolicy::DropOldest(4));
        assert!(config.validate().is_ok());
        assert_eq!(config.max_iterations, Some(10));
        assert!(!config.normalize_inputs);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(FluidConfig::new().with_viscosity(-1.0).validate().is_err());
        assert!(FluidConfig::new().with_sigmas(0.0, 15.0).validate().is_err());
        assert!(FluidConfig::new().with_interval(Duration::ZERO).validate().is_err());
        assert!(FluidConfig::new().with_max_iterations(0).validate().is_err());
        assert!(FluidConfig::new()
            .with_backlog(BacklogPolicy::DropOldest(0))
            .validate()
            .is_err());
        assert!(FluidConfig::new().with_grab_threshold(f32::NAN).validate().is_err());
    }

    #[test]
    fn test_validate_viscosity() {
        assert!(validate_viscosity(0.0).is_ok());
        assert!(validate_viscosity(f64::INFINITY).is_err());
    }
}
