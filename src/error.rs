//! Error types.
//!
//! Infeasibility (a vehicle that cannot reach any station) is not an error:
//! it is a valid terminal state recorded on the vehicle's assignment. The
//! errors here cover input that must be rejected before any search begins.

use crate::model::VehicleId;
use thiserror::Error;

/// Malformed scheduling input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("vehicle {vehicle}: {energy_len} energy costs but {travel_len} travel times")]
    MismatchedCandidates {
        vehicle: VehicleId,
        energy_len: usize,
        travel_len: usize,
    },

    #[error("vehicle {vehicle}: candidate lists cover {found} stations, expected {expected}")]
    StationCountMismatch {
        vehicle: VehicleId,
        expected: usize,
        found: usize,
    },

    #[error("vehicle {vehicle}: battery level {value} outside [0, 100]")]
    BatteryOutOfRange { vehicle: VehicleId, value: f64 },

    #[error("vehicle {vehicle}: battery cycle {value} is negative or not finite")]
    InvalidCycle { vehicle: VehicleId, value: f64 },

    #[error("vehicle {vehicle}: negative or NaN {what} for station {station}")]
    NegativeCandidate {
        vehicle: VehicleId,
        station: usize,
        what: &'static str,
    },

    #[error("vehicle {vehicle}: fixed assignment references unknown station {station}")]
    UnknownStation { vehicle: VehicleId, station: usize },

    #[error("vehicle {vehicle}: fixed assignment references unknown slot {slot} at station {station}")]
    UnknownSlot {
        vehicle: VehicleId,
        station: usize,
        slot: usize,
    },

    #[error("vehicle {vehicle}: fixed assignment has no committed waiting/received values")]
    FixedAssignmentUntimed { vehicle: VehicleId },

    #[error("station {station} slot {slot}: resident battery level {value} outside [0, 100]")]
    ResidentOutOfRange {
        station: usize,
        slot: usize,
        value: f64,
    },
}

/// Invalid or unreadable scheduler configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level error returned by every scheduling entry point.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("at least one destroy and one repair operator required")]
    NoOperators,
}

/// Result alias for scheduling operations.
pub type Result<T> = std::result::Result<T, ScheduleError>;
