//! Solver tuning knobs.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Iteration and tolerance budget handed to the minimizer for every cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Iteration cap per cluster per frame. Hitting it discards that cluster's result.
    pub max_iterations: usize,
    /// Step-size tolerance below which the minimizer reports convergence.
    pub tolerance: f64,
    /// Relative step used for the finite-difference gradient.
    pub gradient_step: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-6,
            gradient_step: 1e-6,
        }
    }
}

impl SolverConfig {
    /// Parse a config from JSON. Missing fields fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SolverConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::Invalid("max_iterations must be positive".to_string()));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(ConfigError::Invalid(format!("tolerance must be positive, got {}", self.tolerance)));
        }
        if !(self.gradient_step.is_finite() && self.gradient_step > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "gradient_step must be positive, got {}",
                self.gradient_step
            )));
        }
        Ok(())
    }
}
