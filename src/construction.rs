//! Feasibility rules, initial solutions and single-move neighbours.

use crate::model::{
    Assignment, Solution, StationSlots, SwapPlan, UnassignedReason, VehicleId, VehicleRequest,
};
use crate::objective::Objective;
use crate::timeline::{simulate, ChargeModel, SlotTimeline};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// How battery wear enters the energy budget.
///
/// Both conventions shrink the budget as cycles accumulate. A run uses one
/// convention for feasibility and for the battery left on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationMode {
    /// Usable capacity is `battery_now · (1 − k·cycle)`; trip cost is
    /// scaled by the reciprocal.
    DeflateCapacity,
    /// Trip cost is `cost · (1 + k·cycle)`.
    InflateCost,
}

/// Per-cycle capacity loss model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Degradation {
    /// Capacity lost per equivalent full cycle (k).
    pub per_cycle: f64,
    pub mode: DegradationMode,
}

impl Degradation {
    pub fn new(per_cycle: f64, mode: DegradationMode) -> Self {
        Self { per_cycle, mode }
    }

    /// Remaining capacity fraction after `cycle` cycles.
    pub fn capacity_factor(&self, cycle: f64) -> f64 {
        1.0 - self.per_cycle * cycle
    }

    /// Battery percentage a trip of nominal `cost` drains from a battery
    /// with `cycle` cycles. Infinite once the battery has no capacity left.
    pub fn effective_cost(&self, cost: f64, cycle: f64) -> f64 {
        match self.mode {
            DegradationMode::DeflateCapacity => {
                let factor = self.capacity_factor(cycle);
                if factor <= 0.0 {
                    f64::INFINITY
                } else {
                    cost / factor
                }
            }
            DegradationMode::InflateCost => cost * (1.0 + self.per_cycle * cycle),
        }
    }
}

/// A reachable `(station, slot)` with the trip that gets there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotOption {
    pub station: usize,
    pub slot: usize,
    pub energy_cost: f64,
    pub travel_time: f64,
}

/// Immutable snapshot of one scheduling run.
///
/// Owns its copy of the requests and slot states; operators and drivers
/// read from it and never write back.
#[derive(Debug, Clone)]
pub struct SwapProblem {
    pub requests: BTreeMap<VehicleId, VehicleRequest>,
    pub stations: StationSlots,
    pub charge: ChargeModel,
    pub degradation: Degradation,
    pub objective: Objective,

    /// Vehicles above this charge are left idle.
    pub comfortable_battery_pct: f64,

    /// Vehicles whose charge after reaching the nearest station stays at or
    /// above this margin are left idle.
    pub urgency_threshold_pct: f64,
}

impl SwapProblem {
    /// True iff the vehicle reaches `station` without running dry.
    pub fn is_feasible(&self, vehicle: &VehicleRequest, station: usize) -> bool {
        vehicle.candidate(station).is_some_and(|(cost, _)| {
            vehicle.battery_now - self.degradation.effective_cost(cost, vehicle.battery_cycle)
                >= 0.0
        })
    }

    /// Every feasible `(station, slot)` accepted by `keep`, in station order.
    pub fn feasible_options<F>(&self, vehicle: &VehicleRequest, keep: F) -> Vec<SlotOption>
    where
        F: Fn(usize, usize) -> bool,
    {
        let mut options = Vec::new();
        for (station, slots) in self.stations.iter().enumerate() {
            if !self.is_feasible(vehicle, station) {
                continue;
            }
            let Some((energy_cost, travel_time)) = vehicle.candidate(station) else {
                continue;
            };
            for slot in 0..slots.len() {
                if keep(station, slot) {
                    options.push(SlotOption {
                        station,
                        slot,
                        energy_cost,
                        travel_time,
                    });
                }
            }
        }
        options
    }

    /// Builds an untimed plan for `vehicle` at `option`.
    pub fn plan_for(&self, vehicle: &VehicleRequest, option: SlotOption) -> SwapPlan {
        let drained = self
            .degradation
            .effective_cost(option.energy_cost, vehicle.battery_cycle);
        SwapPlan::new(
            option.station,
            option.slot,
            option.energy_cost,
            option.travel_time,
            vehicle.battery_now - drained,
            vehicle.battery_cycle,
        )
    }

    /// Whether a non-fixed vehicle should be scheduled this round.
    pub fn needs_swap(&self, vehicle: &VehicleRequest) -> bool {
        if vehicle.battery_now > self.comfortable_battery_pct {
            return false;
        }
        let nearest = (0..self.stations.len())
            .filter_map(|s| vehicle.candidate(s))
            .map(|(cost, _)| {
                self.degradation
                    .effective_cost(cost, vehicle.battery_cycle)
            })
            .fold(f64::INFINITY, f64::min);
        vehicle.battery_now - nearest < self.urgency_threshold_pct
    }

    pub fn is_fixed(&self, id: VehicleId) -> bool {
        self.requests.get(&id).is_some_and(VehicleRequest::is_fixed)
    }

    /// Assigned vehicles the search may move, in id order.
    pub fn movable_ids(&self, solution: &Solution) -> Vec<VehicleId> {
        solution
            .assigned()
            .map(|(id, _)| id)
            .filter(|&id| !self.is_fixed(id))
            .collect()
    }

    /// Re-derives every waiting and received value in place.
    pub fn retime(&self, solution: &mut Solution) -> SlotTimeline {
        simulate(solution, &self.requests, &self.stations, &self.charge)
    }

    pub fn score(&self, solution: &Solution) -> f64 {
        self.objective.score(solution, self.degradation.per_cycle)
    }

    /// Assigns `id` to a uniformly random option accepted by `keep`, or
    /// leaves it unassigned with `fallback` when there is none. Returns the
    /// chosen slot.
    pub(crate) fn assign_random<R, F>(
        &self,
        solution: &mut Solution,
        id: VehicleId,
        keep: F,
        fallback: UnassignedReason,
        rng: &mut R,
    ) -> Option<(usize, usize)>
    where
        R: Rng,
        F: Fn(usize, usize) -> bool,
    {
        let vehicle = self.requests.get(&id)?;
        let options = self.feasible_options(vehicle, keep);
        if options.is_empty() {
            solution.insert(id, Assignment::unassigned(vehicle, fallback));
            return None;
        }
        let option = options[rng.random_range(0..options.len())];
        solution.insert(id, Assignment::Assigned(self.plan_for(vehicle, option)));
        Some((option.station, option.slot))
    }
}

/// Random energy-feasible assignment of every vehicle that needs a swap.
///
/// Committed swaps are copied through, comfortable vehicles are left idle,
/// and the rest go to a uniformly random feasible slot.
#[instrument(level = "debug", skip_all, fields(vehicles = problem.requests.len()))]
pub fn random_initial_solution<R: Rng>(problem: &SwapProblem, rng: &mut R) -> Solution {
    let mut solution = Solution::new();
    let mut idle = 0usize;

    for (&id, vehicle) in &problem.requests {
        if let Some(plan) = &vehicle.fixed_assignment {
            solution.insert(id, Assignment::Assigned(plan.clone()));
        } else if !problem.needs_swap(vehicle) {
            solution.insert(id, Assignment::unassigned(vehicle, UnassignedReason::Idle));
            idle += 1;
        } else {
            problem.assign_random(
                &mut solution,
                id,
                |_, _| true,
                UnassignedReason::Infeasible,
                rng,
            );
        }
    }

    problem.retime(&mut solution);
    debug!(
        assigned = solution.assigned_count(),
        idle, "initial solution built"
    );
    solution
}

/// Moves one random movable vehicle to another random feasible slot.
pub fn single_move_neighbor<R: Rng>(
    problem: &SwapProblem,
    solution: &Solution,
    rng: &mut R,
) -> Solution {
    let mut neighbor = solution.clone();
    let movable = problem.movable_ids(&neighbor);
    if movable.is_empty() {
        return neighbor;
    }
    let id = movable[rng.random_range(0..movable.len())];
    problem.assign_random(
        &mut neighbor,
        id,
        |_, _| true,
        UnassignedReason::Infeasible,
        rng,
    );
    problem.retime(&mut neighbor);
    neighbor
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{ResidentBattery, SwapTiming};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    pub(crate) fn problem_with(
        requests: Vec<(VehicleId, VehicleRequest)>,
        stations: StationSlots,
    ) -> SwapProblem {
        SwapProblem {
            requests: requests.into_iter().collect(),
            stations,
            charge: ChargeModel::new(100.0 / 240.0, 80.0),
            degradation: Degradation::new(0.00025, DegradationMode::DeflateCapacity),
            objective: Objective::NetGain,
            comfortable_battery_pct: 40.0,
            urgency_threshold_pct: 15.0,
        }
    }

    pub(crate) fn two_stations() -> StationSlots {
        vec![
            vec![ResidentBattery::new(90.0, 50.0), ResidentBattery::new(60.0, 80.0)],
            vec![ResidentBattery::new(75.0, 10.0)],
        ]
    }

    #[test]
    fn test_effective_cost_conventions() {
        let deflate = Degradation::new(0.00025, DegradationMode::DeflateCapacity);
        let inflate = Degradation::new(0.00025, DegradationMode::InflateCost);

        assert!((deflate.effective_cost(10.0, 2000.0) - 20.0).abs() < 1e-9);
        assert!((inflate.effective_cost(10.0, 2000.0) - 15.0).abs() < 1e-9);
        assert!(deflate.effective_cost(10.0, 4000.0).is_infinite());
        assert_eq!(deflate.effective_cost(10.0, 0.0), 10.0);
    }

    #[test]
    fn test_feasibility_uses_degraded_capacity() {
        let problem = problem_with(vec![], two_stations());
        // 20% usable at cycle 2000 is 10% of nominal capacity.
        let worn = VehicleRequest::new(20.0, 2000.0)
            .with_candidate(10.0, 5.0)
            .with_candidate(10.5, 5.0);
        assert!(problem.is_feasible(&worn, 0));
        assert!(!problem.is_feasible(&worn, 1));
        assert!(!problem.is_feasible(&worn, 2));
    }

    #[test]
    fn test_unreachable_station_never_feasible() {
        let problem = problem_with(vec![], two_stations());
        let v = VehicleRequest::new(30.0, 0.0)
            .with_unreachable()
            .with_candidate(5.0, 5.0);
        assert!(!problem.is_feasible(&v, 0));
        let options = problem.feasible_options(&v, |_, _| true);
        assert_eq!(options.len(), 1);
        assert_eq!((options[0].station, options[0].slot), (1, 0));
    }

    #[test]
    fn test_needs_swap_rules() {
        let problem = problem_with(vec![], two_stations());
        let comfortable = VehicleRequest::new(70.0, 0.0).with_candidate(60.0, 5.0);
        let margin_ok = VehicleRequest::new(35.0, 0.0).with_candidate(5.0, 5.0);
        let urgent = VehicleRequest::new(35.0, 0.0).with_candidate(25.0, 5.0);
        let stranded = VehicleRequest::new(10.0, 0.0).with_unreachable();

        assert!(!problem.needs_swap(&comfortable));
        assert!(!problem.needs_swap(&margin_ok));
        assert!(problem.needs_swap(&urgent));
        assert!(problem.needs_swap(&stranded));
    }

    #[test]
    fn test_initial_solution_is_complete() {
        let fixed = SwapPlan::new(1, 0, 3.0, 4.0, 20.0, 30.0)
            .with_timing(SwapTiming {
                waiting_time: 0.0,
                received_battery: 76.67,
                received_cycle: 10.02,
            })
            .committed();
        let problem = problem_with(
            vec![
                (1, VehicleRequest::new(90.0, 0.0).with_candidate(5.0, 5.0).with_candidate(5.0, 5.0)),
                (2, VehicleRequest::new(20.0, 0.0).with_candidate(8.0, 12.0).with_candidate(9.0, 14.0)),
                (3, VehicleRequest::new(5.0, 0.0).with_candidate(30.0, 12.0).with_candidate(40.0, 14.0)),
                (4, VehicleRequest::new(25.0, 30.0).with_candidate(3.0, 4.0).with_candidate(3.0, 4.0).with_fixed_assignment(fixed.clone())),
            ],
            two_stations(),
        );
        let mut rng = StdRng::seed_from_u64(7);

        let solution = random_initial_solution(&problem, &mut rng);

        assert_eq!(solution.len(), 4);
        assert_eq!(
            solution.get(1).and_then(Assignment::unassigned_reason),
            Some(UnassignedReason::Idle)
        );
        let plan = solution.get(2).and_then(Assignment::plan).expect("assigned");
        assert!(plan.timing.is_some());
        assert!((plan.exchanged_battery - (20.0 - plan.energy_cost)).abs() < 1e-9);
        assert_eq!(
            solution.get(3).and_then(Assignment::unassigned_reason),
            Some(UnassignedReason::Infeasible)
        );
        assert_eq!(solution.get(4).and_then(Assignment::plan), Some(&fixed));
    }

    #[test]
    fn test_single_move_keeps_fixed_and_completeness() {
        let fixed = SwapPlan::new(0, 0, 3.0, 4.0, 20.0, 30.0)
            .with_timing(SwapTiming {
                waiting_time: 0.0,
                received_battery: 90.0,
                received_cycle: 50.0,
            })
            .committed();
        let problem = problem_with(
            vec![
                (1, VehicleRequest::new(20.0, 0.0).with_candidate(8.0, 12.0).with_candidate(9.0, 14.0)),
                (2, VehicleRequest::new(15.0, 0.0).with_candidate(4.0, 3.0).with_candidate(6.0, 9.0)),
                (3, VehicleRequest::new(30.0, 0.0).with_candidate(3.0, 4.0).with_candidate(3.0, 4.0).with_fixed_assignment(fixed.clone())),
            ],
            two_stations(),
        );
        let mut rng = StdRng::seed_from_u64(11);
        let mut current = random_initial_solution(&problem, &mut rng);

        for _ in 0..50 {
            current = single_move_neighbor(&problem, &current, &mut rng);
            assert_eq!(current.len(), 3);
            assert_eq!(current.get(3).and_then(Assignment::plan), Some(&fixed));
            assert!(current.get(1).is_some_and(Assignment::is_assigned));
            assert!(current.get(2).is_some_and(Assignment::is_assigned));
        }
    }

    #[test]
    fn test_single_move_without_movable_is_identity() {
        let problem = problem_with(
            vec![(1, VehicleRequest::new(90.0, 0.0).with_candidate(5.0, 5.0))],
            two_stations(),
        );
        let mut rng = StdRng::seed_from_u64(3);
        let initial = random_initial_solution(&problem, &mut rng);
        let next = single_move_neighbor(&problem, &initial, &mut rng);
        assert_eq!(initial, next);
    }
}
