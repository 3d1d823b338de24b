//! Destroy and repair operators over swap solutions.
//!
//! # Operators
//!
//! - [`RandomDestroy`]: unassigns a random sample of movable vehicles
//! - [`HighWaitingDestroy`]: unassigns the vehicles that wait longest
//! - [`RandomRepair`]: reinserts at any feasible slot
//! - [`AvailableRepair`]: reinserts only at slots nobody holds
//!
//! Committed swaps are never removable. Repairs retime the whole solution
//! once after all reinsertions.

use crate::alns::{DestroyOperator, Destroyed, RepairOperator};
use crate::construction::SwapProblem;
use crate::model::{Assignment, Solution, UnassignedReason, VehicleId};
use rand::seq::index;
use rand::Rng;
use std::collections::HashSet;

type SwapDestroyed = Destroyed<Solution, VehicleId>;

/// Draws the removal count: uniform in `[1, max(1, ⌊ratio·n⌋)]`.
fn removal_count<R: Rng>(movable: usize, ratio: f64, rng: &mut R) -> usize {
    let upper = ((movable as f64 * ratio).floor() as usize).clamp(1, movable.max(1));
    rng.random_range(1..=upper)
}

fn unassign(problem: &SwapProblem, solution: &mut Solution, ids: &[VehicleId]) {
    for &id in ids {
        if let Some(request) = problem.requests.get(&id) {
            solution.insert(id, Assignment::unassigned(request, UnassignedReason::Removed));
        }
    }
}

/// Unassigns a uniform random sample of movable vehicles.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomDestroy;

impl DestroyOperator<SwapProblem> for RandomDestroy {
    fn name(&self) -> &str {
        "random_destroy"
    }

    fn destroy<R: Rng>(
        &self,
        problem: &SwapProblem,
        solution: &Solution,
        ratio: f64,
        rng: &mut R,
    ) -> SwapDestroyed {
        let movable = problem.movable_ids(solution);
        if movable.is_empty() {
            return Destroyed::untouched(solution.clone());
        }

        let count = removal_count(movable.len(), ratio, rng);
        let removed: Vec<VehicleId> = index::sample(rng, movable.len(), count)
            .into_iter()
            .map(|i| movable[i])
            .collect();

        let mut result = solution.clone();
        unassign(problem, &mut result, &removed);
        Destroyed {
            solution: result,
            removed,
        }
    }
}

/// Unassigns a random-length prefix of movable vehicles ranked by waiting
/// time, longest first.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighWaitingDestroy;

impl DestroyOperator<SwapProblem> for HighWaitingDestroy {
    fn name(&self) -> &str {
        "high_waiting_destroy"
    }

    fn destroy<R: Rng>(
        &self,
        problem: &SwapProblem,
        solution: &Solution,
        ratio: f64,
        rng: &mut R,
    ) -> SwapDestroyed {
        let mut ranked: Vec<(VehicleId, f64)> = solution
            .assigned()
            .filter(|&(id, plan)| !problem.is_fixed(id) && plan.timing.is_some())
            .map(|(id, plan)| (id, plan.waiting_time()))
            .collect();
        if ranked.is_empty() {
            return Destroyed::untouched(solution.clone());
        }

        // Stable sort keeps id order among equal waits.
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        let count = removal_count(ranked.len(), ratio, rng);
        let removed: Vec<VehicleId> = ranked.iter().take(count).map(|&(id, _)| id).collect();

        let mut result = solution.clone();
        unassign(problem, &mut result, &removed);
        Destroyed {
            solution: result,
            removed,
        }
    }
}

/// Reinserts each removed vehicle at a uniformly random feasible slot,
/// occupied or not. Queueing sorts out contention.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomRepair;

impl RepairOperator<SwapProblem> for RandomRepair {
    fn name(&self) -> &str {
        "random_repair"
    }

    fn repair<R: Rng>(
        &self,
        problem: &SwapProblem,
        destroyed: SwapDestroyed,
        rng: &mut R,
    ) -> Solution {
        let Destroyed {
            mut solution,
            removed,
        } = destroyed;
        for id in removed {
            problem.assign_random(
                &mut solution,
                id,
                |_, _| true,
                UnassignedReason::Infeasible,
                rng,
            );
        }
        problem.retime(&mut solution);
        solution
    }
}

/// Reinserts each removed vehicle at a random feasible slot that no
/// assigned vehicle holds. Vehicles left without such a slot stay
/// unassigned.
#[derive(Debug, Clone, Copy, Default)]
pub struct AvailableRepair;

impl RepairOperator<SwapProblem> for AvailableRepair {
    fn name(&self) -> &str {
        "available_repair"
    }

    fn repair<R: Rng>(
        &self,
        problem: &SwapProblem,
        destroyed: SwapDestroyed,
        rng: &mut R,
    ) -> Solution {
        let Destroyed {
            mut solution,
            removed,
        } = destroyed;
        let mut used: HashSet<(usize, usize)> = solution.used_slots();

        for id in removed {
            let Some(request) = problem.requests.get(&id) else {
                continue;
            };
            let fallback = if problem.feasible_options(request, |_, _| true).is_empty() {
                UnassignedReason::Infeasible
            } else {
                UnassignedReason::NoFreeSlot
            };
            let taken = &used;
            let chosen = problem.assign_random(
                &mut solution,
                id,
                |station, slot| !taken.contains(&(station, slot)),
                fallback,
                rng,
            );
            if let Some(key) = chosen {
                used.insert(key);
            }
        }
        problem.retime(&mut solution);
        solution
    }
}

/// The destroy pool used by the scheduler.
#[derive(Debug, Clone, Copy)]
pub enum SwapDestroy {
    Random(RandomDestroy),
    HighWaiting(HighWaitingDestroy),
}

impl SwapDestroy {
    pub fn all() -> Vec<Self> {
        vec![
            SwapDestroy::Random(RandomDestroy),
            SwapDestroy::HighWaiting(HighWaitingDestroy),
        ]
    }
}

impl DestroyOperator<SwapProblem> for SwapDestroy {
    fn name(&self) -> &str {
        match self {
            SwapDestroy::Random(op) => op.name(),
            SwapDestroy::HighWaiting(op) => op.name(),
        }
    }

    fn destroy<R: Rng>(
        &self,
        problem: &SwapProblem,
        solution: &Solution,
        ratio: f64,
        rng: &mut R,
    ) -> SwapDestroyed {
        match self {
            SwapDestroy::Random(op) => op.destroy(problem, solution, ratio, rng),
            SwapDestroy::HighWaiting(op) => op.destroy(problem, solution, ratio, rng),
        }
    }
}

/// The repair pool used by the scheduler.
#[derive(Debug, Clone, Copy)]
pub enum SwapRepair {
    Random(RandomRepair),
    Available(AvailableRepair),
}

impl SwapRepair {
    pub fn all() -> Vec<Self> {
        vec![
            SwapRepair::Random(RandomRepair),
            SwapRepair::Available(AvailableRepair),
        ]
    }
}

impl RepairOperator<SwapProblem> for SwapRepair {
    fn name(&self) -> &str {
        match self {
            SwapRepair::Random(op) => op.name(),
            SwapRepair::Available(op) => op.name(),
        }
    }

    fn repair<R: Rng>(
        &self,
        problem: &SwapProblem,
        destroyed: SwapDestroyed,
        rng: &mut R,
    ) -> Solution {
        match self {
            SwapRepair::Random(op) => op.repair(problem, destroyed, rng),
            SwapRepair::Available(op) => op.repair(problem, destroyed, rng),
        }
    }
}
