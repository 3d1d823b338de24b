//! ALNS configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Configuration for the ALNS driver.
///
/// # Operator scoring
///
/// Every operator starts with weight 1 and score 0. When the chosen
/// destroy/repair pair yields a new best solution both operators gain
/// `reward`; otherwise both lose `penalty`. An operator's selection weight
/// is `max(min_weight, 1 + score)`. Every `reset_interval` iterations all
/// weights and scores return to their initial values.
///
/// # Examples
///
/// ```
/// use swap_sched::alns::AlnsConfig;
///
/// let config = AlnsConfig::default()
///     .with_max_iterations(500)
///     .with_reset_interval(25)
///     .with_destroy_ratio(0.2)
///     .with_seed(42);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlnsConfig {
    /// Iteration budget.
    pub max_iterations: usize,

    /// Iterations between weight resets.
    pub reset_interval: usize,

    /// Upper bound on the fraction of movable vehicles removed per destroy.
    pub destroy_ratio: f64,

    /// Score added to both operators on a new best.
    pub reward: f64,

    /// Score subtracted from both operators otherwise.
    pub penalty: f64,

    /// Lower bound on an operator's selection weight.
    pub min_weight: f64,

    /// Wall-clock limit in milliseconds, checked between iterations.
    pub time_limit_ms: Option<u64>,

    /// Random seed for reproducibility.
    pub seed: Option<u64>,
}

impl Default for AlnsConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            reset_interval: 50,
            destroy_ratio: 0.1,
            reward: 1.0,
            penalty: 1.0,
            min_weight: 0.0,
            time_limit_ms: None,
            seed: None,
        }
    }
}

impl AlnsConfig {
    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn with_reset_interval(mut self, n: usize) -> Self {
        self.reset_interval = n.max(1);
        self
    }

    pub fn with_destroy_ratio(mut self, ratio: f64) -> Self {
        self.destroy_ratio = ratio;
        self
    }

    pub fn with_scores(mut self, reward: f64, penalty: f64) -> Self {
        self.reward = reward;
        self.penalty = penalty;
        self
    }

    pub fn with_min_weight(mut self, w: f64) -> Self {
        self.min_weight = w;
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
        if self.max_iterations == 0 {
            return Err(ConfigError::Invalid("alns.max_iterations must be positive".into()));
        }
        if self.reset_interval == 0 {
            return Err(ConfigError::Invalid("alns.reset_interval must be positive".into()));
        }
        if !(self.destroy_ratio > 0.0 && self.destroy_ratio <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "alns.destroy_ratio must be in (0, 1], got {}",
                self.destroy_ratio
            )));
        }
        if !(self.reward >= 0.0 && self.penalty >= 0.0) {
            return Err(ConfigError::Invalid(
                "alns.reward and alns.penalty must be non-negative".into(),
            ));
        }
        if !(self.min_weight >= 0.0) {
            return Err(ConfigError::Invalid("alns.min_weight must be non-negative".into()));
        }
        Ok(())
    }
}
