//! Queue-timeline simulator.
//!
//! Every swap slot is a single-server FIFO resource. The simulator replays
//! the slot queues implied by a [`Solution`]: committed swaps first, then
//! every movable vehicle in arrival order. A vehicle waits until the battery
//! left behind by its predecessor has charged to the swap threshold, and
//! takes whatever charge that battery has reached by then.
//!
//! The timeline is rebuilt from scratch on every call. Nothing carries over
//! between calls, so recomputing an unchanged solution gives identical
//! results.

use crate::model::{Solution, StationSlots, SwapTiming, VehicleId, VehicleRequest};
use std::collections::{BTreeMap, HashMap};
use tracing::{instrument, warn};

/// Derived values are rounded to this many decimal places.
pub const DECIMALS: i32 = 2;

/// Rounds to [`DECIMALS`] places.
pub fn round_to_precision(value: f64) -> f64 {
    let scale = 10f64.powi(DECIMALS);
    (value * scale).round() / scale
}

/// Linear charging model shared by planning and admission control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargeModel {
    /// Charge gained per minute in a slot, percent.
    pub rate_pct_per_min: f64,

    /// Minimum level a resident battery must reach before it can be handed out.
    pub swap_threshold_pct: f64,
}

impl ChargeModel {
    pub fn new(rate_pct_per_min: f64, swap_threshold_pct: f64) -> Self {
        Self {
            rate_pct_per_min,
            swap_threshold_pct,
        }
    }

    /// Minutes until a battery at `level` reaches the swap threshold.
    pub fn time_to_threshold(&self, level: f64) -> f64 {
        ((self.swap_threshold_pct - level) / self.rate_pct_per_min).max(0.0)
    }

    /// Level after charging for `minutes`, capped at 100.
    pub fn level_after(&self, level: f64, minutes: f64) -> f64 {
        (level + minutes * self.rate_pct_per_min).min(100.0)
    }

    /// Cycle count after charging from `from_level` to `to_level`.
    pub fn cycle_after(from_level: f64, from_cycle: f64, to_level: f64) -> f64 {
        from_cycle + (to_level - from_level) / 100.0
    }
}

/// State of a slot after a swap: when it was vacated, and the battery left in it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineEntry {
    pub ready_time: f64,
    pub level: f64,
    pub cycle: f64,
}

/// Per-slot swap history built by one simulator pass.
#[derive(Debug, Clone, Default)]
pub struct SlotTimeline {
    entries: HashMap<(usize, usize), Vec<TimelineEntry>>,
}

impl SlotTimeline {
    /// Seeds the timeline with committed swaps, each slot sorted by ready time.
    fn from_fixed(requests: &BTreeMap<VehicleId, VehicleRequest>) -> Self {
        let mut entries: HashMap<(usize, usize), Vec<TimelineEntry>> = HashMap::new();
        for plan in requests.values().filter_map(|r| r.fixed_assignment.as_ref()) {
            entries.entry(plan.slot_key()).or_default().push(TimelineEntry {
                ready_time: plan.ready_time(),
                level: plan.exchanged_battery,
                cycle: plan.exchanged_cycle,
            });
        }
        for queue in entries.values_mut() {
            queue.sort_by(|a, b| a.ready_time.total_cmp(&b.ready_time));
        }
        Self { entries }
    }

    /// Swaps recorded for a slot, oldest first.
    pub fn entries(&self, station: usize, slot: usize) -> &[TimelineEntry] {
        self.entries
            .get(&(station, slot))
            .map_or(&[], |queue| queue.as_slice())
    }

    /// Most recent swap at a slot, if any.
    pub fn last(&self, station: usize, slot: usize) -> Option<&TimelineEntry> {
        self.entries(station, slot).last()
    }

    fn push(&mut self, key: (usize, usize), entry: TimelineEntry) {
        self.entries.entry(key).or_default().push(entry);
    }
}

/// Returns a copy of `solution` with waiting and received values filled in
/// for every assigned, non-fixed vehicle.
pub fn recompute_timeline(
    solution: &Solution,
    requests: &BTreeMap<VehicleId, VehicleRequest>,
    stations: &StationSlots,
    model: &ChargeModel,
) -> Solution {
    let mut updated = solution.clone();
    simulate(&mut updated, requests, stations, model);
    updated
}

/// Runs the simulator over an owned solution, writing timings in place,
/// and returns the slot timeline it built.
#[instrument(level = "trace", skip_all, fields(vehicles = solution.len()))]
pub fn simulate(
    solution: &mut Solution,
    requests: &BTreeMap<VehicleId, VehicleRequest>,
    stations: &StationSlots,
    model: &ChargeModel,
) -> SlotTimeline {
    let mut timeline = SlotTimeline::from_fixed(requests);

    let mut arrivals: Vec<(f64, VehicleId, (usize, usize))> = solution
        .assigned()
        .filter(|(id, _)| !requests.get(id).is_some_and(VehicleRequest::is_fixed))
        .map(|(id, plan)| (plan.travel_time, id, plan.slot_key()))
        .collect();
    arrivals.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    for (arrival, id, key @ (station, slot)) in arrivals {
        let previous = match timeline.last(station, slot) {
            Some(entry) => *entry,
            None => match stations.get(station).and_then(|s| s.get(slot)) {
                Some(resident) => TimelineEntry {
                    ready_time: 0.0,
                    level: resident.level,
                    cycle: resident.cycle,
                },
                None => {
                    warn!(vehicle = id, station, slot, "assignment references missing slot");
                    continue;
                }
            },
        };

        let ready = previous.ready_time + model.time_to_threshold(previous.level);
        let waiting = (ready - arrival).max(0.0);
        let departure = arrival + waiting;
        let received = model.level_after(previous.level, departure - previous.ready_time);
        let received_cycle = ChargeModel::cycle_after(previous.level, previous.cycle, received);

        let Some(plan) = solution.get_mut(id).and_then(|a| a.plan_mut()) else {
            continue;
        };
        plan.timing = Some(SwapTiming {
            waiting_time: round_to_precision(waiting),
            received_battery: round_to_precision(received),
            received_cycle: round_to_precision(received_cycle),
        });

        timeline.push(
            key,
            TimelineEntry {
                ready_time: departure,
                level: plan.exchanged_battery,
                cycle: plan.exchanged_cycle,
            },
        );
    }

    timeline
}
