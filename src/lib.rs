//! Battery-swap scheduling for electric vehicle fleets.
//!
//! Assigns low-battery vehicles to `(station, slot)` pairs and estimates how
//! long each driver will wait for a charged battery. The pieces:
//!
//! - **Queue-timeline simulator** ([`timeline`]): replays every slot as a
//!   single-server FIFO queue with linear charging, deriving waiting time and
//!   the charge handed to each vehicle.
//! - **Feasibility and construction** ([`construction`]): degradation-aware
//!   energy budgets, random initial solutions and single-move neighbours.
//! - **Destroy/repair operators** ([`operators`]): random and
//!   worst-waiting removal; random and free-slot reinsertion.
//! - **ALNS**: Adaptive Large Neighborhood Search ([`alns`]), the primary
//!   driver, with roulette-wheel operator selection and greedy acceptance.
//! - **Simulated Annealing (SA)** ([`sa`]): the alternative driver over
//!   single-move neighbours.
//! - **Objectives** ([`objective`]): ratio and net-gain formulations.
//! - **Admission** ([`admission`]): live battery selection on arrival, using
//!   the simulator's charging arithmetic.
//!
//! [`scheduler::SwapScheduler`] ties these together behind a
//! [`config::SchedulerConfig`].
//!
//! # Architecture
//!
//! The [`alns`] and [`sa`] drivers are generic over problem traits and know
//! nothing about batteries. The domain lives in [`construction`],
//! [`operators`] and [`timeline`], which implement those traits for
//! [`construction::SwapProblem`]. Each scheduling call works on its own copy
//! of the caller's inputs, so independent calls may run concurrently.

pub mod admission;
pub mod alns;
pub mod config;
pub mod construction;
pub mod error;
pub mod model;
pub mod objective;
pub mod operators;
pub mod sa;
pub mod scheduler;
pub mod timeline;

pub use config::{SchedulerConfig, Strategy};
pub use error::{ConfigError, Result, ScheduleError, ValidationError};
pub use model::{Assignment, ResidentBattery, Solution, StationSlots, SwapPlan, VehicleRequest};
pub use scheduler::{ScheduleOutcome, SwapScheduler};
