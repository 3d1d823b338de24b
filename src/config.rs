//! Scheduler configuration.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! strategy = "alns"
//! swap_threshold_pct = 80.0
//!
//! [alns]
//! max_iterations = 2000
//! seed = 7
//! ```

use crate::alns::AlnsConfig;
use crate::construction::DegradationMode;
use crate::error::ConfigError;
use crate::objective::Objective;
use crate::sa::SaConfig;
use crate::timeline::ChargeModel;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which driver runs the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Adaptive Large Neighborhood Search over destroy/repair pairs.
    #[default]
    Alns,
    /// Simulated annealing over single-vehicle moves.
    Annealing,
}

impl Strategy {
    /// Degradation convention used when none is configured.
    pub fn default_degradation(self) -> DegradationMode {
        match self {
            Strategy::Alns => DegradationMode::DeflateCapacity,
            Strategy::Annealing => DegradationMode::InflateCost,
        }
    }

    /// Objective used when none is configured.
    pub fn default_objective(self) -> Objective {
        match self {
            Strategy::Alns => Objective::NetGain,
            Strategy::Annealing => Objective::Ratio,
        }
    }
}

/// Configuration for a [`SwapScheduler`](crate::scheduler::SwapScheduler).
///
/// # Examples
///
/// ```
/// use swap_sched::config::{SchedulerConfig, Strategy};
///
/// let config = SchedulerConfig::from_toml_str(
///     r#"
///     strategy = "annealing"
///     [sa]
///     alpha = 0.9
///     "#,
/// )
/// .unwrap();
/// assert_eq!(config.strategy, Strategy::Annealing);
/// assert!((config.sa.alpha - 0.9).abs() < 1e-12);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub strategy: Strategy,

    /// Charge gained per minute by a battery resting in a slot, percent.
    pub charge_rate_pct_per_min: f64,

    /// A resident battery is handed out once it reaches this level.
    pub swap_threshold_pct: f64,

    /// Vehicles that would keep at least this much charge after reaching
    /// their nearest station are left idle.
    pub urgency_threshold_pct: f64,

    /// Vehicles above this charge are left idle.
    pub comfortable_battery_pct: f64,

    /// Capacity lost per equivalent full cycle.
    pub degradation_per_cycle: f64,

    /// Overrides the strategy's degradation convention.
    pub degradation: Option<DegradationMode>,

    /// Overrides the strategy's objective.
    pub objective: Option<Objective>,

    /// Independent seeded runs; the best result is kept.
    pub restarts: usize,

    pub alns: AlnsConfig,
    pub sa: SaConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Alns,
            charge_rate_pct_per_min: 100.0 / 240.0,
            swap_threshold_pct: 80.0,
            urgency_threshold_pct: 15.0,
            comfortable_battery_pct: 40.0,
            degradation_per_cycle: 0.00025,
            degradation: None,
            objective: None,
            restarts: 1,
            alns: AlnsConfig::default(),
            sa: SaConfig::default(),
        }
    }
}

impl SchedulerConfig {
    /// Loads configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_charge_rate(mut self, pct_per_min: f64) -> Self {
        self.charge_rate_pct_per_min = pct_per_min;
        self
    }

    pub fn with_swap_threshold(mut self, pct: f64) -> Self {
        self.swap_threshold_pct = pct;
        self
    }

    pub fn with_urgency_threshold(mut self, pct: f64) -> Self {
        self.urgency_threshold_pct = pct;
        self
    }

    pub fn with_comfortable_battery(mut self, pct: f64) -> Self {
        self.comfortable_battery_pct = pct;
        self
    }

    pub fn with_degradation_per_cycle(mut self, k: f64) -> Self {
        self.degradation_per_cycle = k;
        self
    }

    pub fn with_degradation(mut self, mode: DegradationMode) -> Self {
        self.degradation = Some(mode);
        self
    }

    pub fn with_objective(mut self, objective: Objective) -> Self {
        self.objective = Some(objective);
        self
    }

    pub fn with_restarts(mut self, restarts: usize) -> Self {
        self.restarts = restarts;
        self
    }

    pub fn with_alns(mut self, alns: AlnsConfig) -> Self {
        self.alns = alns;
        self
    }

    pub fn with_sa(mut self, sa: SaConfig) -> Self {
        self.sa = sa;
        self
    }

    /// Sets the seed of both drivers.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.alns.seed = Some(seed);
        self.sa.seed = Some(seed);
        self
    }

    pub fn degradation_mode(&self) -> DegradationMode {
        self.degradation
            .unwrap_or_else(|| self.strategy.default_degradation())
    }

    pub fn objective(&self) -> Objective {
        self.objective
            .unwrap_or_else(|| self.strategy.default_objective())
    }

    pub fn charge_model(&self) -> ChargeModel {
        ChargeModel::new(self.charge_rate_pct_per_min, self.swap_threshold_pct)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.charge_rate_pct_per_min > 0.0 && self.charge_rate_pct_per_min.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "charge_rate_pct_per_min must be positive, got {}",
                self.charge_rate_pct_per_min
            )));
        }
        let percentages = [
            ("swap_threshold_pct", self.swap_threshold_pct),
            ("urgency_threshold_pct", self.urgency_threshold_pct),
            ("comfortable_battery_pct", self.comfortable_battery_pct),
        ];
        for (name, value) in percentages {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be in [0, 100], got {value}"
                )));
            }
        }
        if !(self.degradation_per_cycle >= 0.0 && self.degradation_per_cycle.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "degradation_per_cycle must be non-negative, got {}",
                self.degradation_per_cycle
            )));
        }
        if self.restarts == 0 {
            return Err(ConfigError::Invalid("restarts must be positive".into()));
        }
        match self.strategy {
            Strategy::Alns => self.alns.validate(),
            Strategy::Annealing => self.sa.validate(),
        }
    }
}
