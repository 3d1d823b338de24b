//! Simulated Annealing (SA).
//!
//! A single-solution trajectory search. Improving neighbours are always
//! accepted; worsening ones with probability `exp(Δ / T)`, where the
//! temperature `T` cools geometrically every iteration.
//!
//! # References
//!
//! - Kirkpatrick, Gelatt & Vecchi (1983), "Optimization by Simulated Annealing"
//! - Cerny (1985), "Thermodynamical Approach to the Travelling Salesman Problem"

mod config;
mod runner;
mod types;

pub use config::SaConfig;
pub use runner::{SaResult, SaRunner};
pub use types::SaProblem;
