//! Scheduling entry point.
//!
//! [`SwapScheduler`] validates a request snapshot, copies it into a
//! [`SwapProblem`], and hands the problem to the configured driver. Callers
//! keep ownership of their inputs; nothing they pass in is modified.

use crate::alns::{AlnsProblem, AlnsRunner, DestroyOperator, RepairOperator};
use crate::config::{SchedulerConfig, Strategy};
use crate::construction::{random_initial_solution, single_move_neighbor, Degradation, SwapProblem};
use crate::error::{ConfigError, Result, ValidationError};
use crate::model::{Solution, StationSlots, VehicleId, VehicleRequest};
use crate::operators::{SwapDestroy, SwapRepair};
use crate::sa::{SaProblem, SaRunner};
use rand::Rng;
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, instrument};

impl AlnsProblem for SwapProblem {
    type Solution = Solution;
    type Key = VehicleId;

    fn initial_solution<R: Rng>(&self, rng: &mut R) -> Solution {
        random_initial_solution(self, rng)
    }

    fn score(&self, solution: &Solution) -> f64 {
        SwapProblem::score(self, solution)
    }
}

impl SaProblem for SwapProblem {
    type Solution = Solution;

    fn initial_solution<R: Rng>(&self, rng: &mut R) -> Solution {
        random_initial_solution(self, rng)
    }

    fn score(&self, solution: &Solution) -> f64 {
        SwapProblem::score(self, solution)
    }

    fn neighbor<R: Rng>(&self, solution: &Solution, rng: &mut R) -> Solution {
        single_move_neighbor(self, solution, rng)
    }
}

/// Driver-specific statistics of the winning run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunDiagnostics {
    Alns {
        improvements: usize,
        /// Final weights, keyed by operator name.
        destroy_weights: Vec<(String, f64)>,
        repair_weights: Vec<(String, f64)>,
    },
    Annealing {
        final_temperature: f64,
        accepted_moves: usize,
        improving_moves: usize,
    },
    /// No search ran: the fleet or the station inventory was empty.
    Skipped,
}

/// Result of one [`SwapScheduler::schedule`] call.
#[derive(Debug, Clone)]
pub struct ScheduleOutcome {
    /// One assignment per input vehicle.
    pub solution: Solution,

    /// Objective value of `solution`. When `diagnostics` is
    /// [`RunDiagnostics::Skipped`] no search ran and this is 0.0, whatever
    /// the objective would give the idle vehicles.
    pub score: f64,

    /// Best score after each iteration of the winning run.
    pub score_history: Vec<f64>,

    pub iterations: usize,

    /// Whether the winning run stopped early on cancellation or its deadline.
    pub cancelled: bool,

    pub strategy: Strategy,

    /// Number of independent runs performed.
    pub restarts: usize,

    pub diagnostics: RunDiagnostics,
}

/// Battery-swap scheduler.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use swap_sched::config::SchedulerConfig;
/// use swap_sched::model::{ResidentBattery, VehicleRequest};
/// use swap_sched::scheduler::SwapScheduler;
///
/// let mut requests = BTreeMap::new();
/// requests.insert(1, VehicleRequest::new(18.0, 120.0).with_candidate(6.0, 12.0));
/// requests.insert(2, VehicleRequest::new(75.0, 40.0).with_candidate(3.0, 5.0));
/// let stations = vec![vec![ResidentBattery::new(50.0, 100.0)]];
///
/// let config = SchedulerConfig::default().with_seed(7);
/// let scheduler = SwapScheduler::new(config).unwrap();
/// let outcome = scheduler.schedule(&requests, &stations).unwrap();
///
/// assert_eq!(outcome.solution.len(), 2);
/// assert!(outcome.solution.get(1).unwrap().is_assigned());
/// ```
#[derive(Debug, Clone)]
pub struct SwapScheduler {
    config: SchedulerConfig,
    start_time: Option<SystemTime>,
}

impl SwapScheduler {
    /// Creates a scheduler after validating `config`.
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            start_time: None,
        })
    }

    /// Stamps `scheduled_time` on pending plans, counted from `start`.
    pub fn with_start_time(mut self, start: SystemTime) -> Self {
        self.start_time = Some(start);
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Schedules the fleet against the given slot states.
    pub fn schedule(
        &self,
        requests: &BTreeMap<VehicleId, VehicleRequest>,
        stations: &StationSlots,
    ) -> Result<ScheduleOutcome> {
        self.schedule_with_cancel(requests, stations, None)
    }

    /// Schedules with an optional cancellation flag, checked by the driver
    /// between iterations. A cancelled run returns its best solution so far.
    #[instrument(level = "debug", skip_all, fields(strategy = ?self.config.strategy))]
    pub fn schedule_with_cancel(
        &self,
        requests: &BTreeMap<VehicleId, VehicleRequest>,
        stations: &StationSlots,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<ScheduleOutcome> {
        validate_input(requests, stations)?;
        let problem = self.build_problem(requests, stations);
        let slots: usize = stations.iter().map(Vec::len).sum();

        info!(
            strategy = ?self.config.strategy,
            vehicles = requests.len(),
            stations = stations.len(),
            slots,
            "scheduling started"
        );

        let mut outcome = if requests.is_empty() || slots == 0 {
            self.skip(&problem)
        } else {
            self.run_restarts(&problem, cancel)?
        };

        if let Some(start) = self.start_time {
            outcome
                .solution
                .project_scheduled_times(start, |id| problem.is_fixed(id));
        }

        info!(
            score = outcome.score,
            assigned = outcome.solution.assigned_count(),
            iterations = outcome.iterations,
            cancelled = outcome.cancelled,
            "scheduling finished"
        );
        Ok(outcome)
    }

    fn build_problem(
        &self,
        requests: &BTreeMap<VehicleId, VehicleRequest>,
        stations: &StationSlots,
    ) -> SwapProblem {
        let config = &self.config;
        SwapProblem {
            requests: requests.clone(),
            stations: stations.clone(),
            charge: config.charge_model(),
            degradation: Degradation::new(config.degradation_per_cycle, config.degradation_mode()),
            objective: config.objective(),
            comfortable_battery_pct: config.comfortable_battery_pct,
            urgency_threshold_pct: config.urgency_threshold_pct,
        }
    }

    // Nothing to optimise: every vehicle ends idle or infeasible and the
    // score is the empty-solution value.
    fn skip(&self, problem: &SwapProblem) -> ScheduleOutcome {
        let mut rng = rand::rng();
        let solution = random_initial_solution(problem, &mut rng);
        ScheduleOutcome {
            solution,
            score: 0.0,
            score_history: Vec::new(),
            iterations: 0,
            cancelled: false,
            strategy: self.config.strategy,
            restarts: 0,
            diagnostics: RunDiagnostics::Skipped,
        }
    }

    fn run_restarts(
        &self,
        problem: &SwapProblem,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<ScheduleOutcome> {
        let restarts = self.config.restarts;

        #[cfg(feature = "parallel")]
        let outcomes: Vec<ScheduleOutcome> = {
            use rayon::prelude::*;
            (0..restarts)
                .into_par_iter()
                .map(|index| self.run_once(problem, index, cancel.clone()))
                .collect::<Result<Vec<_>>>()?
        };

        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<ScheduleOutcome> = (0..restarts)
            .map(|index| self.run_once(problem, index, cancel.clone()))
            .collect::<Result<Vec<_>>>()?;

        // Earliest run wins ties.
        let mut best = outcomes
            .into_iter()
            .reduce(|best, next| if next.score > best.score { next } else { best })
            .ok_or_else(|| ConfigError::Invalid("restarts must be positive".into()))?;
        best.restarts = restarts;
        Ok(best)
    }

    fn run_once(
        &self,
        problem: &SwapProblem,
        index: usize,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<ScheduleOutcome> {
        let strategy = self.config.strategy;
        let outcome = match strategy {
            Strategy::Alns => {
                let mut config = self.config.alns.clone();
                config.seed = config.seed.map(|s| s.wrapping_add(index as u64));
                let destroy = SwapDestroy::all();
                let repair = SwapRepair::all();
                let result =
                    AlnsRunner::run_with_cancel(problem, &destroy, &repair, &config, cancel)?;
                ScheduleOutcome {
                    solution: result.best,
                    score: result.best_score,
                    score_history: result.score_history,
                    iterations: result.iterations,
                    cancelled: result.cancelled,
                    strategy,
                    restarts: 1,
                    diagnostics: RunDiagnostics::Alns {
                        improvements: result.improvements,
                        destroy_weights: named(&destroy, &result.destroy_weights, |op| {
                            op.name().to_string()
                        }),
                        repair_weights: named(&repair, &result.repair_weights, |op| {
                            op.name().to_string()
                        }),
                    },
                }
            }
            Strategy::Annealing => {
                let mut config = self.config.sa.clone();
                config.seed = config.seed.map(|s| s.wrapping_add(index as u64));
                let result = SaRunner::run_with_cancel(problem, &config, cancel)?;
                ScheduleOutcome {
                    solution: result.best,
                    score: result.best_score,
                    score_history: result.score_history,
                    iterations: result.iterations,
                    cancelled: result.cancelled,
                    strategy,
                    restarts: 1,
                    diagnostics: RunDiagnostics::Annealing {
                        final_temperature: result.final_temperature,
                        accepted_moves: result.accepted_moves,
                        improving_moves: result.improving_moves,
                    },
                }
            }
        };
        debug!(restart = index, score = outcome.score, "run finished");
        Ok(outcome)
    }
}

fn named<T, F>(ops: &[T], weights: &[f64], name: F) -> Vec<(String, f64)>
where
    F: Fn(&T) -> String,
{
    ops.iter().map(name).zip(weights.iter().copied()).collect()
}

fn valid_percent(value: f64) -> bool {
    (0.0..=100.0).contains(&value)
}

/// Rejects malformed input before any search starts.
///
/// Candidate lists must cover every station. With no stations at all, the
/// lists are ignored.
pub fn validate_input(
    requests: &BTreeMap<VehicleId, VehicleRequest>,
    stations: &StationSlots,
) -> std::result::Result<(), ValidationError> {
    for (station, slots) in stations.iter().enumerate() {
        for (slot, resident) in slots.iter().enumerate() {
            if !valid_percent(resident.level) {
                return Err(ValidationError::ResidentOutOfRange {
                    station,
                    slot,
                    value: resident.level,
                });
            }
        }
    }

    for (&vehicle, request) in requests {
        if !valid_percent(request.battery_now) {
            return Err(ValidationError::BatteryOutOfRange {
                vehicle,
                value: request.battery_now,
            });
        }
        if !(request.battery_cycle >= 0.0 && request.battery_cycle.is_finite()) {
            return Err(ValidationError::InvalidCycle {
                vehicle,
                value: request.battery_cycle,
            });
        }

        let energy_len = request.candidate_energy_cost.len();
        let travel_len = request.candidate_travel_time.len();
        if energy_len != travel_len {
            return Err(ValidationError::MismatchedCandidates {
                vehicle,
                energy_len,
                travel_len,
            });
        }
        if !stations.is_empty() && energy_len != stations.len() {
            return Err(ValidationError::StationCountMismatch {
                vehicle,
                expected: stations.len(),
                found: energy_len,
            });
        }

        let columns = [
            ("energy cost", &request.candidate_energy_cost),
            ("travel time", &request.candidate_travel_time),
        ];
        for (what, values) in columns {
            for (station, value) in values.iter().enumerate() {
                if value.is_some_and(|v| v.is_nan() || v < 0.0) {
                    return Err(ValidationError::NegativeCandidate {
                        vehicle,
                        station,
                        what,
                    });
                }
            }
        }

        if let Some(plan) = &request.fixed_assignment {
            let Some(slots) = stations.get(plan.station) else {
                return Err(ValidationError::UnknownStation {
                    vehicle,
                    station: plan.station,
                });
            };
            if plan.slot >= slots.len() {
                return Err(ValidationError::UnknownSlot {
                    vehicle,
                    station: plan.station,
                    slot: plan.slot,
                });
            }
            if plan.timing.is_none() {
                return Err(ValidationError::FixedAssignmentUntimed { vehicle });
            }
        }
    }
    Ok(())
}
