//! SA execution loop.

use super::config::SaConfig;
use super::types::SaProblem;
use crate::error::ScheduleError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

/// Result of a Simulated Annealing run.
#[derive(Debug, Clone)]
pub struct SaResult<S: Clone> {
    /// The best solution found.
    pub best: S,

    /// Score of the best solution.
    pub best_score: f64,

    /// Total number of iterations (neighbour evaluations).
    pub iterations: usize,

    /// Final temperature when the algorithm stopped.
    pub final_temperature: f64,

    /// Number of accepted moves (including improvements).
    pub accepted_moves: usize,

    /// Number of improving moves.
    pub improving_moves: usize,

    /// Whether the run stopped on the cancel flag or the time limit.
    pub cancelled: bool,

    /// Best score after each iteration.
    pub score_history: Vec<f64>,
}

/// Executes the Simulated Annealing algorithm.
pub struct SaRunner;

impl SaRunner {
    /// Runs SA optimization.
    pub fn run<P: SaProblem>(
        problem: &P,
        config: &SaConfig,
    ) -> Result<SaResult<P::Solution>, ScheduleError> {
        Self::run_with_cancel(problem, config, None)
    }

    /// Runs SA with an optional cancellation token.
    #[instrument(level = "debug", skip_all, fields(max_iterations = config.max_iterations))]
    pub fn run_with_cancel<P: SaProblem>(
        problem: &P,
        config: &SaConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<SaResult<P::Solution>, ScheduleError> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let deadline = config
            .time_limit_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms));

        let mut current = problem.initial_solution(&mut rng);
        let mut current_score = problem.score(&current);
        let mut best = current.clone();
        let mut best_score = current_score;

        let mut temperature = config.initial_temperature;
        let mut iterations = 0usize;
        let mut accepted_moves = 0usize;
        let mut improving_moves = 0usize;
        let mut cancelled = false;
        let mut score_history = Vec::with_capacity(config.max_iterations);

        while iterations < config.max_iterations && temperature >= config.min_temperature {
            if cancel.as_ref().is_some_and(|f| f.load(Ordering::Relaxed))
                || deadline.is_some_and(|d| Instant::now() >= d)
            {
                cancelled = true;
                break;
            }

            let neighbor = problem.neighbor(&current, &mut rng);
            let neighbor_score = problem.score(&neighbor);
            let delta = neighbor_score - current_score;

            // Metropolis acceptance on a maximised score
            let accept = if delta > 0.0 {
                improving_moves += 1;
                true
            } else {
                rng.random_range(0.0..1.0) < (delta / temperature).exp()
            };

            if accept {
                current = neighbor;
                current_score = neighbor_score;
                accepted_moves += 1;

                if current_score > best_score {
                    debug!(iteration = iterations, score = current_score, "new best");
                    best = current.clone();
                    best_score = current_score;
                }
            }

            iterations += 1;
            score_history.push(best_score);
            temperature *= config.alpha;
        }

        info!(
            iterations,
            accepted_moves,
            best_score,
            final_temperature = temperature,
            cancelled,
            "annealing finished"
        );

        Ok(SaResult {
            best,
            best_score,
            iterations,
            final_temperature: temperature,
            accepted_moves,
            improving_moves,
            cancelled,
            score_history,
        })
    }
}
