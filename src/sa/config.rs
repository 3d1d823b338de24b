//! SA configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Configuration for the Simulated Annealing driver.
///
/// The run stops when the temperature drops below `min_temperature` or
/// after `max_iterations` neighbour evaluations, whichever comes first.
///
/// # Examples
///
/// ```
/// use swap_sched::sa::SaConfig;
///
/// let config = SaConfig::default()
///     .with_initial_temperature(50.0)
///     .with_alpha(0.98)
///     .with_max_iterations(500);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaConfig {
    /// Initial temperature. Higher values allow more exploration.
    pub initial_temperature: f64,

    /// Geometric cooling factor in (0, 1): `T_{k+1} = alpha * T_k`.
    pub alpha: f64,

    /// The run stops once the temperature falls below this.
    pub min_temperature: f64,

    /// Iteration budget.
    pub max_iterations: usize,

    /// Wall-clock limit in milliseconds, checked between iterations.
    pub time_limit_ms: Option<u64>,

    /// Random seed for reproducibility.
    pub seed: Option<u64>,
}

impl Default for SaConfig {
    fn default() -> Self {
        Self {
            initial_temperature: 100.0,
            alpha: 0.95,
            min_temperature: 0.001,
            max_iterations: 200,
            time_limit_ms: None,
            seed: None,
        }
    }
}

impl SaConfig {
    pub fn with_initial_temperature(mut self, t: f64) -> Self {
        self.initial_temperature = t;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_min_temperature(mut self, t: f64) -> Self {
        self.min_temperature = t;
        self
    }

    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn with_time_limit_ms(mut self, ms: u64) -> Self {
        self.time_limit_ms = Some(ms);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.initial_temperature > 0.0) {
            return Err(ConfigError::Invalid(
                "sa.initial_temperature must be positive".into(),
            ));
        }
        if !(self.min_temperature > 0.0) {
            return Err(ConfigError::Invalid("sa.min_temperature must be positive".into()));
        }
        if self.min_temperature >= self.initial_temperature {
            return Err(ConfigError::Invalid(
                "sa.min_temperature must be less than sa.initial_temperature".into(),
            ));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "sa.alpha must be in (0, 1), got {}",
                self.alpha
            )));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::Invalid("sa.max_iterations must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SaConfig::default();
        assert!((config.initial_temperature - 100.0).abs() < 1e-10);
        assert!((config.alpha - 0.95).abs() < 1e-10);
        assert_eq!(config.max_iterations, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bad_temperature() {
        let config = SaConfig::default().with_initial_temperature(-1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_min_ge_initial() {
        let config = SaConfig::default()
            .with_initial_temperature(10.0)
            .with_min_temperature(20.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_alpha() {
        assert!(SaConfig::default().with_alpha(1.0).validate().is_err());
        assert!(SaConfig::default().with_alpha(0.0).validate().is_err());
    }
}
