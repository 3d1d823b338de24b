//! Solution scoring. Higher is better in both formulations.

use crate::model::{Assignment, Solution, UnassignedReason};
use serde::{Deserialize, Serialize};

/// Waiting minutes count this many times a travel minute in the ratio denominator.
const RATIO_WAITING_WEIGHT: f64 = 10.0;

/// Weight of degradation-adjusted energy gain in the net-gain form.
const NET_GAIN_ENERGY_WEIGHT: f64 = 0.2;

/// Weight of waiting time in the net-gain form.
const NET_GAIN_WAITING_WEIGHT: f64 = 0.8;

/// Objective formulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Urgency served per hour of travel and (weighted) waiting.
    ///
    /// `(Σ(100 − exchanged)² + Σ idle battery_now²) / ((travel + 10·waiting) / 60)`,
    /// or the bare numerator when the denominator is zero.
    Ratio,

    /// `Σ 0.2·(received·(1 − k·received_cycle) − exchanged·(1 − k·exchanged_cycle)) − 0.8·waiting`.
    NetGain,
}

impl Objective {
    /// Scores a solution. `k` is the per-cycle capacity loss.
    pub fn score(self, solution: &Solution, k: f64) -> f64 {
        match self {
            Objective::Ratio => ratio_score(solution),
            Objective::NetGain => net_gain_score(solution, k),
        }
    }
}

/// Ratio formulation. See [`Objective::Ratio`].
pub fn ratio_score(solution: &Solution) -> f64 {
    let mut travel = 0.0;
    let mut waiting = 0.0;
    let mut urgency = 0.0;

    for (_, assignment) in solution.iter() {
        match assignment {
            Assignment::Assigned(plan) => {
                travel += plan.travel_time;
                waiting += plan.waiting_time();
                urgency += (100.0 - plan.exchanged_battery).powi(2);
            }
            Assignment::Unassigned {
                battery_now,
                reason: UnassignedReason::Idle,
                ..
            } => {
                urgency += battery_now.powi(2);
            }
            Assignment::Unassigned { .. } => {}
        }
    }

    let hours = (travel + RATIO_WAITING_WEIGHT * waiting) / 60.0;
    if hours > 0.0 {
        urgency / hours
    } else {
        urgency
    }
}

/// Net-gain formulation. See [`Objective::NetGain`].
pub fn net_gain_score(solution: &Solution, k: f64) -> f64 {
    solution
        .assigned()
        .map(|(_, plan)| {
            let timing = plan.timing.unwrap_or_default();
            let gain = timing.received_battery * (1.0 - k * timing.received_cycle)
                - plan.exchanged_battery * (1.0 - k * plan.exchanged_cycle);
            NET_GAIN_ENERGY_WEIGHT * gain - NET_GAIN_WAITING_WEIGHT * timing.waiting_time
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SwapPlan, SwapTiming, VehicleRequest};

    const K: f64 = 0.00025;

    fn plan(travel: f64, exchanged: f64, waiting: f64, received: f64) -> Assignment {
        Assignment::Assigned(SwapPlan::new(0, 0, 5.0, travel, exchanged, 0.0).with_timing(
            SwapTiming {
                waiting_time: waiting,
                received_battery: received,
                received_cycle: 0.0,
            },
        ))
    }

    #[test]
    fn test_empty_solution_is_zero() {
        let empty = Solution::new();
        assert_eq!(Objective::Ratio.score(&empty, K), 0.0);
        assert_eq!(Objective::NetGain.score(&empty, K), 0.0);
    }

    #[test]
    fn test_ratio_counts_idle_only() {
        let req = VehicleRequest::new(50.0, 0.0);
        let solution: Solution = [
            (1, plan(30.0, 20.0, 3.0, 90.0)),
            (2, Assignment::unassigned(&req, UnassignedReason::Idle)),
            (3, Assignment::unassigned(&req, UnassignedReason::Infeasible)),
        ]
        .into_iter()
        .collect();

        // (80² + 50²) / ((30 + 30) / 60)
        let expected = (6400.0 + 2500.0) / 1.0;
        assert!((ratio_score(&solution) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_ratio_without_travel_uses_numerator() {
        let req = VehicleRequest::new(60.0, 0.0);
        let solution: Solution = [(1, Assignment::unassigned(&req, UnassignedReason::Idle))]
            .into_iter()
            .collect();
        assert!((ratio_score(&solution) - 3600.0).abs() < 1e-9);
    }

    #[test]
    fn test_net_gain_penalises_waiting() {
        let fast: Solution = [(1, plan(10.0, 20.0, 0.0, 80.0))].into_iter().collect();
        let slow: Solution = [(1, plan(10.0, 20.0, 10.0, 80.0))].into_iter().collect();

        assert!((net_gain_score(&fast, K) - 12.0).abs() < 1e-9);
        assert!((net_gain_score(&slow, K) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_net_gain_applies_degradation() {
        let mut solution = Solution::new();
        solution.insert(
            1,
            Assignment::Assigned(SwapPlan::new(0, 0, 5.0, 10.0, 20.0, 400.0).with_timing(
                SwapTiming {
                    waiting_time: 0.0,
                    received_battery: 80.0,
                    received_cycle: 800.0,
                },
            )),
        );
        // 0.2 * (80 * 0.8 - 20 * 0.9) = 0.2 * 46
        assert!((net_gain_score(&solution, K) - 9.2).abs() < 1e-9);
    }
}
