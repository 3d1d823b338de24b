//! Core trait for Simulated Annealing.

use rand::Rng;

/// Defines a Simulated Annealing problem.
///
/// The user implements neighbour generation and scoring. The framework
/// handles temperature, acceptance and cooling.
///
/// # Maximization
///
/// SA maximises the score. For minimisation, negate the cost.
pub trait SaProblem: Send + Sync {
    /// The solution representation type.
    type Solution: Clone + Send;

    /// Creates a random initial solution.
    fn initial_solution<R: Rng>(&self, rng: &mut R) -> Self::Solution;

    /// Scores a solution. Higher is better.
    fn score(&self, solution: &Self::Solution) -> f64;

    /// Generates a neighbour of the current solution.
    ///
    /// The neighbour should be a small perturbation; the returned value is
    /// a fresh solution and `solution` is left untouched.
    fn neighbor<R: Rng>(&self, solution: &Self::Solution, rng: &mut R) -> Self::Solution;
}
