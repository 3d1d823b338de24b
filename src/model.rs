//! Scheduling data model.
//!
//! Requests and station slots are caller-owned snapshots; the scheduler
//! clones them on entry and never writes back. A [`Solution`] is built
//! fresh for every run and always holds one [`Assignment`] per vehicle.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::{Duration, SystemTime};

/// Fleet vehicle identifier.
pub type VehicleId = u64;

/// Energy costs or travel times at or above this value mark a station as
/// unreachable. Upstream distance lookups emit it when routing fails.
pub const UNREACHABLE_SENTINEL: f64 = 99_999.0;

/// One vehicle's input to a scheduling run.
///
/// `candidate_energy_cost[s]` and `candidate_travel_time[s]` describe the
/// trip to station `s`. `None` means unreachable and is never read as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleRequest {
    /// State of charge, percent.
    pub battery_now: f64,

    /// Equivalent full-charge cycles accumulated by the vehicle's battery.
    pub battery_cycle: f64,

    /// Percent of battery consumed to reach each station.
    pub candidate_energy_cost: Vec<Option<f64>>,

    /// Minutes to reach each station.
    pub candidate_travel_time: Vec<Option<f64>>,

    /// A committed swap the optimizer must keep verbatim.
    #[serde(default)]
    pub fixed_assignment: Option<SwapPlan>,

    /// Identifier of the battery currently mounted, used by admission control.
    #[serde(default)]
    pub battery_id: Option<u64>,
}

impl VehicleRequest {
    pub fn new(battery_now: f64, battery_cycle: f64) -> Self {
        Self {
            battery_now,
            battery_cycle,
            candidate_energy_cost: Vec::new(),
            candidate_travel_time: Vec::new(),
            fixed_assignment: None,
            battery_id: None,
        }
    }

    /// Appends a reachable station.
    pub fn with_candidate(mut self, energy_cost: f64, travel_time: f64) -> Self {
        self.candidate_energy_cost.push(Some(energy_cost));
        self.candidate_travel_time.push(Some(travel_time));
        self
    }

    /// Appends an unreachable station.
    pub fn with_unreachable(mut self) -> Self {
        self.candidate_energy_cost.push(None);
        self.candidate_travel_time.push(None);
        self
    }

    pub fn with_fixed_assignment(mut self, plan: SwapPlan) -> Self {
        self.fixed_assignment = Some(plan);
        self
    }

    pub fn with_battery_id(mut self, id: u64) -> Self {
        self.battery_id = Some(id);
        self
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed_assignment.is_some()
    }

    /// Returns `(energy_cost, travel_time)` for a reachable station.
    pub fn candidate(&self, station: usize) -> Option<(f64, f64)> {
        let energy = self.candidate_energy_cost.get(station).copied().flatten()?;
        let travel = self.candidate_travel_time.get(station).copied().flatten()?;
        if !energy.is_finite()
            || !travel.is_finite()
            || energy >= UNREACHABLE_SENTINEL
            || travel >= UNREACHABLE_SENTINEL
        {
            return None;
        }
        Some((energy, travel))
    }
}

/// Battery resident in a swap slot when the run begins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResidentBattery {
    /// State of charge, percent.
    pub level: f64,

    /// Equivalent full-charge cycles.
    pub cycle: f64,

    #[serde(default)]
    pub id: Option<u64>,
}

impl ResidentBattery {
    pub fn new(level: f64, cycle: f64) -> Self {
        Self {
            level,
            cycle,
            id: None,
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }
}

/// Slot contents per station, indexed `[station][slot]`.
pub type StationSlots = Vec<Vec<ResidentBattery>>;

/// Lifecycle of a planned swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapStatus {
    /// Proposed by the optimizer, not yet acted on.
    #[default]
    Pending,
    /// Accepted by the system of record; must not be moved.
    Committed,
}

/// Values derived by the queue-timeline simulator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SwapTiming {
    /// Minutes spent at the slot before the resident battery is ready.
    pub waiting_time: f64,

    /// Charge of the battery handed to the vehicle, percent.
    pub received_battery: f64,

    /// Cycle count of the battery handed to the vehicle.
    pub received_cycle: f64,
}

/// An assigned swap: which slot, how the vehicle gets there, and what it
/// leaves behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapPlan {
    pub station: usize,
    pub slot: usize,
    pub energy_cost: f64,
    pub travel_time: f64,

    /// Battery level on arrival, after degradation-adjusted consumption.
    pub exchanged_battery: f64,
    pub exchanged_cycle: f64,

    /// `None` until the simulator has run over the solution.
    #[serde(default)]
    pub timing: Option<SwapTiming>,

    #[serde(default)]
    pub status: SwapStatus,

    #[serde(default)]
    pub scheduled_time: Option<SystemTime>,
}

impl SwapPlan {
    pub fn new(
        station: usize,
        slot: usize,
        energy_cost: f64,
        travel_time: f64,
        exchanged_battery: f64,
        exchanged_cycle: f64,
    ) -> Self {
        Self {
            station,
            slot,
            energy_cost,
            travel_time,
            exchanged_battery,
            exchanged_cycle,
            timing: None,
            status: SwapStatus::Pending,
            scheduled_time: None,
        }
    }

    pub fn with_timing(mut self, timing: SwapTiming) -> Self {
        self.timing = Some(timing);
        self
    }

    /// Marks the plan as committed.
    pub fn committed(mut self) -> Self {
        self.status = SwapStatus::Committed;
        self
    }

    pub fn slot_key(&self) -> (usize, usize) {
        (self.station, self.slot)
    }

    pub fn waiting_time(&self) -> f64 {
        self.timing.map_or(0.0, |t| t.waiting_time)
    }

    /// Instant the vehicle leaves the slot with its new battery.
    pub fn ready_time(&self) -> f64 {
        self.travel_time + self.waiting_time()
    }
}

/// Why a vehicle has no swap in a solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnassignedReason {
    /// Enough charge left; deliberately not scheduled this round.
    Idle,
    /// No reachable station within the energy budget.
    Infeasible,
    /// Reachable stations exist but every slot was already taken at repair time.
    NoFreeSlot,
    /// Taken out by a destroy operator and awaiting repair.
    Removed,
}

/// Scheduler output for one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Assignment {
    Unassigned {
        battery_now: f64,
        battery_cycle: f64,
        reason: UnassignedReason,
    },
    Assigned(SwapPlan),
}

impl Assignment {
    pub fn unassigned(request: &VehicleRequest, reason: UnassignedReason) -> Self {
        Assignment::Unassigned {
            battery_now: request.battery_now,
            battery_cycle: request.battery_cycle,
            reason,
        }
    }

    pub fn is_assigned(&self) -> bool {
        matches!(self, Assignment::Assigned(_))
    }

    pub fn plan(&self) -> Option<&SwapPlan> {
        match self {
            Assignment::Assigned(plan) => Some(plan),
            Assignment::Unassigned { .. } => None,
        }
    }

    pub fn plan_mut(&mut self) -> Option<&mut SwapPlan> {
        match self {
            Assignment::Assigned(plan) => Some(plan),
            Assignment::Unassigned { .. } => None,
        }
    }

    pub fn unassigned_reason(&self) -> Option<UnassignedReason> {
        match self {
            Assignment::Unassigned { reason, .. } => Some(*reason),
            Assignment::Assigned(_) => None,
        }
    }
}

/// One assignment per vehicle, ordered by vehicle id.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Solution(BTreeMap<VehicleId, Assignment>);

impl Solution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, id: VehicleId) -> Option<&Assignment> {
        self.0.get(&id)
    }

    pub fn get_mut(&mut self, id: VehicleId) -> Option<&mut Assignment> {
        self.0.get_mut(&id)
    }

    pub fn insert(&mut self, id: VehicleId, assignment: Assignment) -> Option<Assignment> {
        self.0.insert(id, assignment)
    }

    pub fn contains(&self, id: VehicleId) -> bool {
        self.0.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (VehicleId, &Assignment)> {
        self.0.iter().map(|(&id, a)| (id, a))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (VehicleId, &mut Assignment)> {
        self.0.iter_mut().map(|(&id, a)| (id, a))
    }

    /// Iterates over assigned vehicles only.
    pub fn assigned(&self) -> impl Iterator<Item = (VehicleId, &SwapPlan)> {
        self.iter().filter_map(|(id, a)| a.plan().map(|p| (id, p)))
    }

    pub fn assigned_count(&self) -> usize {
        self.assigned().count()
    }

    /// `(station, slot)` pairs held by at least one assigned vehicle.
    pub fn used_slots(&self) -> HashSet<(usize, usize)> {
        self.assigned().map(|(_, p)| p.slot_key()).collect()
    }

    /// Stamps a wall-clock estimate on pending plans that have none:
    /// `start + travel_time + waiting_time` minutes. Vehicles for which
    /// `is_fixed` holds are left untouched.
    pub fn project_scheduled_times<F>(&mut self, start: SystemTime, is_fixed: F)
    where
        F: Fn(VehicleId) -> bool,
    {
        for (id, assignment) in self.iter_mut() {
            if is_fixed(id) {
                continue;
            }
            let Some(plan) = assignment.plan_mut() else {
                continue;
            };
            if plan.status != SwapStatus::Pending || plan.scheduled_time.is_some() {
                continue;
            }
            if let Ok(offset) = Duration::try_from_secs_f64(plan.ready_time() * 60.0) {
                plan.scheduled_time = start.checked_add(offset);
            }
        }
    }
}

impl FromIterator<(VehicleId, Assignment)> for Solution {
    fn from_iter<I: IntoIterator<Item = (VehicleId, Assignment)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
