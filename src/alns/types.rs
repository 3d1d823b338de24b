//! Core traits for ALNS.

use rand::Rng;

/// A partially destroyed solution and the keys taken out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Destroyed<S, K> {
    pub solution: S,
    pub removed: Vec<K>,
}

impl<S, K> Destroyed<S, K> {
    /// A destroy step that removed nothing.
    pub fn untouched(solution: S) -> Self {
        Self {
            solution,
            removed: Vec::new(),
        }
    }
}

/// Defines an ALNS optimization problem.
///
/// The problem supplies an initial solution and a score; destroy and repair
/// operators are provided separately and receive the problem by reference.
///
/// # Maximization
///
/// Scores are maximised. Return the negated cost for minimisation problems.
pub trait AlnsProblem: Send + Sync {
    /// The solution representation type.
    type Solution: Clone + Send;

    /// Identifies one removable element of a solution.
    type Key: Clone + Send;

    /// Creates a random initial solution.
    fn initial_solution<R: Rng>(&self, rng: &mut R) -> Self::Solution;

    /// Scores a solution. Higher is better.
    fn score(&self, solution: &Self::Solution) -> f64;
}

/// A destroy operator removes elements from a solution.
///
/// `ratio` bounds the removal count as a fraction of the removable
/// elements; operators remove at least one element when any exist.
pub trait DestroyOperator<P: AlnsProblem>: Send + Sync {
    /// Returns a human-readable name for this operator.
    fn name(&self) -> &str;

    fn destroy<R: Rng>(
        &self,
        problem: &P,
        solution: &P::Solution,
        ratio: f64,
        rng: &mut R,
    ) -> Destroyed<P::Solution, P::Key>;
}

/// A repair operator reinserts removed elements.
pub trait RepairOperator<P: AlnsProblem>: Send + Sync {
    /// Returns a human-readable name for this operator.
    fn name(&self) -> &str;

    fn repair<R: Rng>(
        &self,
        problem: &P,
        destroyed: Destroyed<P::Solution, P::Key>,
        rng: &mut R,
    ) -> P::Solution;
}
