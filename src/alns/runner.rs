//! ALNS execution loop.

use super::config::AlnsConfig;
use super::types::{AlnsProblem, DestroyOperator, RepairOperator};
use crate::error::ScheduleError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, trace};

/// Result of an ALNS optimization run.
#[derive(Debug, Clone)]
pub struct AlnsResult<S: Clone> {
    /// The best solution found.
    pub best: S,

    /// Score of the best solution.
    pub best_score: f64,

    /// Iterations actually run.
    pub iterations: usize,

    /// Number of new-best events.
    pub improvements: usize,

    /// Whether the run stopped on the cancel flag or the time limit.
    pub cancelled: bool,

    /// Destroy operator weights at termination.
    pub destroy_weights: Vec<f64>,

    /// Repair operator weights at termination.
    pub repair_weights: Vec<f64>,

    /// Best score after each iteration.
    pub score_history: Vec<f64>,
}

/// Running score and selection weight of one operator.
#[derive(Debug, Clone)]
struct OperatorStats {
    weight: f64,
    score: f64,
}

impl OperatorStats {
    fn new() -> Self {
        Self {
            weight: 1.0,
            score: 0.0,
        }
    }

    fn adjust(&mut self, delta: f64, min_weight: f64) {
        self.score += delta;
        self.weight = (1.0 + self.score).max(min_weight);
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

fn weights(stats: &[OperatorStats]) -> Vec<f64> {
    stats.iter().map(|s| s.weight).collect()
}

/// Scales weights to sum to one. Negative and non-finite weights count as
/// zero; when nothing positive remains every entry gets `1 / n`.
pub fn normalize_scores(weights: &[f64]) -> Vec<f64> {
    let clean = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
    let total: f64 = weights.iter().map(|&w| clean(w)).sum();
    if total <= 0.0 {
        let n = weights.len().max(1) as f64;
        return vec![1.0 / n; weights.len()];
    }
    weights.iter().map(|&w| clean(w) / total).collect()
}

/// Select an index with probability proportional to its weight.
///
/// Falls back to uniform selection when no weight is positive, and to the
/// last index if rounding leaves part of the draw unassigned.
pub fn roulette_select<R: Rng>(weights: &[f64], rng: &mut R) -> usize {
    if weights.is_empty() {
        return 0;
    }
    let probabilities = normalize_scores(weights);
    let roll = rng.random_range(0.0..1.0);
    let mut cumulative = 0.0;
    for (i, p) in probabilities.iter().enumerate() {
        cumulative += p;
        if roll < cumulative {
            return i;
        }
    }
    weights.len() - 1
}

fn is_degenerate(stats: &[OperatorStats]) -> bool {
    stats.iter().all(|s| !(s.weight > 0.0))
}

/// Executes the ALNS algorithm.
pub struct AlnsRunner;

impl AlnsRunner {
    /// Runs ALNS optimization.
    pub fn run<P, D, R>(
        problem: &P,
        destroy_ops: &[D],
        repair_ops: &[R],
        config: &AlnsConfig,
    ) -> Result<AlnsResult<P::Solution>, ScheduleError>
    where
        P: AlnsProblem,
        D: DestroyOperator<P>,
        R: RepairOperator<P>,
    {
        Self::run_with_cancel(problem, destroy_ops, repair_ops, config, None)
    }

    /// Runs ALNS with an optional cancellation token.
    ///
    /// The token and the time limit are checked between iterations; a
    /// cancelled run still returns the best solution found so far.
    #[instrument(level = "debug", skip_all, fields(max_iterations = config.max_iterations))]
    pub fn run_with_cancel<P, D, RP>(
        problem: &P,
        destroy_ops: &[D],
        repair_ops: &[RP],
        config: &AlnsConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<AlnsResult<P::Solution>, ScheduleError>
    where
        P: AlnsProblem,
        D: DestroyOperator<P>,
        RP: RepairOperator<P>,
    {
        config.validate()?;
        if destroy_ops.is_empty() || repair_ops.is_empty() {
            return Err(ScheduleError::NoOperators);
        }

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let deadline = config
            .time_limit_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms));

        let mut current = problem.initial_solution(&mut rng);
        let mut best = current.clone();
        let mut best_score = problem.score(&best);

        let mut destroy_stats: Vec<OperatorStats> =
            destroy_ops.iter().map(|_| OperatorStats::new()).collect();
        let mut repair_stats: Vec<OperatorStats> =
            repair_ops.iter().map(|_| OperatorStats::new()).collect();

        let mut improvements = 0usize;
        let mut iterations = 0usize;
        let mut cancelled = false;
        let mut score_history = Vec::with_capacity(config.max_iterations);

        for iteration in 0..config.max_iterations {
            if cancel.as_ref().is_some_and(|f| f.load(Ordering::Relaxed))
                || deadline.is_some_and(|d| Instant::now() >= d)
            {
                cancelled = true;
                break;
            }

            if is_degenerate(&destroy_stats) || is_degenerate(&repair_stats) {
                trace!(iteration, "operator weights degenerate, selecting uniformly");
            }
            let d_idx = roulette_select(&weights(&destroy_stats), &mut rng);
            let r_idx = roulette_select(&weights(&repair_stats), &mut rng);

            let destroyed =
                destroy_ops[d_idx].destroy(problem, &current, config.destroy_ratio, &mut rng);
            let candidate = repair_ops[r_idx].repair(problem, destroyed, &mut rng);
            let candidate_score = problem.score(&candidate);

            // Greedy: only a new best replaces the current solution.
            if candidate_score > best_score {
                debug!(
                    iteration,
                    score = candidate_score,
                    destroy = destroy_ops[d_idx].name(),
                    repair = repair_ops[r_idx].name(),
                    "new best"
                );
                best = candidate.clone();
                current = candidate;
                best_score = candidate_score;
                improvements += 1;
                destroy_stats[d_idx].adjust(config.reward, config.min_weight);
                repair_stats[r_idx].adjust(config.reward, config.min_weight);
            } else {
                trace!(iteration, score = candidate_score, "candidate rejected");
                destroy_stats[d_idx].adjust(-config.penalty, config.min_weight);
                repair_stats[r_idx].adjust(-config.penalty, config.min_weight);
            }

            iterations += 1;
            score_history.push(best_score);

            if (iteration + 1) % config.reset_interval == 0 {
                destroy_stats.iter_mut().for_each(OperatorStats::reset);
                repair_stats.iter_mut().for_each(OperatorStats::reset);
            }
        }

        info!(iterations, improvements, best_score, cancelled, "alns finished");

        Ok(AlnsResult {
            best,
            best_score,
            iterations,
            improvements,
            cancelled,
            destroy_weights: weights(&destroy_stats),
            repair_weights: weights(&repair_stats),
            score_history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alns::Destroyed;

    // ---- Subset maximisation ----
    // Solution: Vec<bool>; score: number of true bits.

    struct SubsetProblem {
        n: usize,
    }

    impl AlnsProblem for SubsetProblem {
        type Solution = Vec<bool>;
        type Key = usize;

        fn initial_solution<R: Rng>(&self, rng: &mut R) -> Vec<bool> {
            (0..self.n).map(|_| rng.random_bool(0.3)).collect()
        }

        fn score(&self, solution: &Vec<bool>) -> f64 {
            solution.iter().filter(|&&b| b).count() as f64
        }
    }

    // Clears a random selection of set bits.
    struct RandomDestroy;

    impl DestroyOperator<SubsetProblem> for RandomDestroy {
        fn name(&self) -> &str {
            "random"
        }

        fn destroy<R: Rng>(
            &self,
            _problem: &SubsetProblem,
            solution: &Vec<bool>,
            ratio: f64,
            rng: &mut R,
        ) -> Destroyed<Vec<bool>, usize> {
            let mut result = solution.clone();
            let mut removed = Vec::new();
            for (i, bit) in result.iter_mut().enumerate() {
                if *bit && rng.random_range(0.0..1.0) < ratio {
                    *bit = false;
                    removed.push(i);
                }
            }
            Destroyed {
                solution: result,
                removed,
            }
        }
    }

    // Restores removed bits and sets each clear bit with probability 0.5.
    struct CoinRepair;

    impl RepairOperator<SubsetProblem> for CoinRepair {
        fn name(&self) -> &str {
            "coin"
        }

        fn repair<R: Rng>(
            &self,
            _problem: &SubsetProblem,
            destroyed: Destroyed<Vec<bool>, usize>,
            rng: &mut R,
        ) -> Vec<bool> {
            let mut result = destroyed.solution;
            for i in destroyed.removed {
                result[i] = true;
            }
            for bit in &mut result {
                if !*bit && rng.random_bool(0.5) {
                    *bit = true;
                }
            }
            result
        }
    }

    // Never improves anything.
    struct NoopRepair;

    impl RepairOperator<SubsetProblem> for NoopRepair {
        fn name(&self) -> &str {
            "noop"
        }

        fn repair<R: Rng>(
            &self,
            _problem: &SubsetProblem,
            destroyed: Destroyed<Vec<bool>, usize>,
            _rng: &mut R,
        ) -> Vec<bool> {
            destroyed.solution
        }
    }

    #[test]
    fn test_alns_basic() {
        let problem = SubsetProblem { n: 20 };
        let config = AlnsConfig::default().with_max_iterations(300).with_seed(42);

        let result = AlnsRunner::run(&problem, &[RandomDestroy], &[CoinRepair], &config).unwrap();

        assert!(result.best_score >= 18.0, "got {}", result.best_score);
        assert_eq!(result.iterations, 300);
        assert_eq!(result.score_history.len(), 300);
        assert!(result.improvements > 0);
    }

    #[test]
    fn test_alns_history_non_decreasing() {
        let problem = SubsetProblem { n: 30 };
        let config = AlnsConfig::default().with_max_iterations(200).with_seed(1);

        let result = AlnsRunner::run(&problem, &[RandomDestroy], &[CoinRepair], &config).unwrap();

        for window in result.score_history.windows(2) {
            assert!(window[1] >= window[0]);
        }
        assert_eq!(result.score_history.last().copied(), Some(result.best_score));
    }

    #[test]
    fn test_alns_weights_reset_at_interval() {
        let problem = SubsetProblem { n: 10 };
        let config = AlnsConfig::default()
            .with_max_iterations(100)
            .with_reset_interval(50)
            .with_seed(5);

        let result = AlnsRunner::run(&problem, &[RandomDestroy], &[NoopRepair], &config).unwrap();

        assert_eq!(result.destroy_weights, vec![1.0]);
        assert_eq!(result.repair_weights, vec![1.0]);
    }

    #[test]
    fn test_alns_failures_drive_weight_to_floor() {
        let problem = SubsetProblem { n: 10 };
        let config = AlnsConfig::default()
            .with_max_iterations(10)
            .with_reset_interval(1000)
            .with_min_weight(0.0)
            .with_seed(5);

        // NoopRepair never beats the initial solution.
        let result = AlnsRunner::run(&problem, &[RandomDestroy], &[NoopRepair], &config).unwrap();

        assert_eq!(result.improvements, 0);
        assert_eq!(result.repair_weights, vec![0.0]);
    }

    #[test]
    fn test_alns_cancellation() {
        let problem = SubsetProblem { n: 20 };
        let config = AlnsConfig::default().with_max_iterations(1000).with_seed(42);
        let cancel = Arc::new(AtomicBool::new(true));

        let result = AlnsRunner::run_with_cancel(
            &problem,
            &[RandomDestroy],
            &[CoinRepair],
            &config,
            Some(cancel),
        )
        .unwrap();

        assert!(result.cancelled);
        assert_eq!(result.iterations, 0);
        assert!(result.score_history.is_empty());
    }

    #[test]
    fn test_alns_requires_operators() {
        let problem = SubsetProblem { n: 5 };
        let config = AlnsConfig::default().with_seed(1);
        let no_repair: [CoinRepair; 0] = [];

        let result = AlnsRunner::run(&problem, &[RandomDestroy], &no_repair, &config);
        assert!(matches!(result, Err(ScheduleError::NoOperators)));
    }

    #[test]
    fn test_normalize_scores() {
        let p = normalize_scores(&[1.0, 3.0]);
        assert!((p[0] - 0.25).abs() < 1e-12);
        assert!((p[1] - 0.75).abs() < 1e-12);

        let uniform = normalize_scores(&[0.0, -2.0, 0.0, f64::NAN]);
        assert!(uniform.iter().all(|&w| (w - 0.25).abs() < 1e-12));

        assert!(normalize_scores(&[]).is_empty());
    }

    #[test]
    fn test_roulette_select_respects_zero_weight() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..200 {
            assert_eq!(roulette_select(&[0.0, 2.0, 0.0], &mut rng), 1);
        }
    }

    #[test]
    fn test_roulette_select_degenerate_is_uniform() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut counts = [0usize; 3];
        for _ in 0..3000 {
            counts[roulette_select(&[0.0, 0.0, 0.0], &mut rng)] += 1;
        }
        for c in counts {
            assert!(c > 800, "counts {counts:?}");
        }
    }
}
