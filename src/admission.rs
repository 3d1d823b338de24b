//! Live admission helpers.
//!
//! When a vehicle physically reaches a station, the station hands out the
//! fullest charged battery it holds. These helpers answer that question with
//! the same charging arithmetic the planner uses.

use crate::model::{ResidentBattery, VehicleRequest};
use crate::timeline::ChargeModel;

/// Minutes until a battery at `level` can be handed out.
pub fn ready_in(level: f64, model: &ChargeModel) -> f64 {
    model.time_to_threshold(level)
}

fn is_own(battery: &ResidentBattery, vehicle: &VehicleRequest) -> bool {
    vehicle.battery_id.is_some() && battery.id == vehicle.battery_id
}

/// Slot index of the fullest battery at or above the swap threshold,
/// skipping the battery `vehicle` is carrying. The first slot wins ties.
pub fn select_resident_battery(
    slots: &[ResidentBattery],
    vehicle: &VehicleRequest,
    model: &ChargeModel,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, battery) in slots.iter().enumerate() {
        if battery.level < model.swap_threshold_pct || is_own(battery, vehicle) {
            continue;
        }
        if best.map_or(true, |(_, level)| battery.level > level) {
            best = Some((index, battery.level));
        }
    }
    best.map(|(index, _)| index)
}

/// Slot whose battery becomes available first, with the minutes to wait.
/// Zero minutes means a battery is ready now.
pub fn soonest_ready(
    slots: &[ResidentBattery],
    vehicle: &VehicleRequest,
    model: &ChargeModel,
) -> Option<(usize, f64)> {
    if let Some(index) = select_resident_battery(slots, vehicle, model) {
        return Some((index, 0.0));
    }
    slots
        .iter()
        .enumerate()
        .filter(|(_, battery)| !is_own(battery, vehicle))
        .map(|(index, battery)| (index, ready_in(battery.level, model)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}
