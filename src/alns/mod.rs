//! Adaptive Large Neighborhood Search (ALNS) framework.
//!
//! Each iteration picks one destroy and one repair operator by roulette
//! wheel over adaptive weights, rebuilds part of the current solution, and
//! keeps the result only if it beats the best score seen so far. Operators
//! that produce a new best are rewarded, the others penalised, and all
//! weights are forgotten at a fixed interval.
//!
//! # References
//!
//! Ropke & Pisinger (2006), "An Adaptive Large Neighborhood Search Heuristic
//! for the Pickup and Delivery Problem with Time Windows"

mod config;
mod runner;
mod types;

pub use config::AlnsConfig;
pub use runner::{normalize_scores, roulette_select, AlnsResult, AlnsRunner};
pub use types::{AlnsProblem, DestroyOperator, Destroyed, RepairOperator};
