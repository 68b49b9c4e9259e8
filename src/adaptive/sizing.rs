//! Batch and population sizing between iterations.
//!
//! Two independent controllers run after every iteration:
//!
//! - **Batch size** keeps the clock overhead negligible:
//!   `batch = clock_time / (conservative_mean * clock_overhead)` where the
//!   conservative mean is `mean_all - sigma_all`, or `mean_all` when that
//!   is not positive. A conservative mean of exactly zero also falls back,
//!   since it would make the target infinite.
//! - **Population size** bounds the relative error of the mean using the
//!   sample-size relation for means:
//!   `population = (2 * confidence_sigma * sigma_all / width)^2 + outliers`
//!   with `width = mean_all * stddev_perc / 100`. Adding the outliers back
//!   compensates for the expected rejection rate.
//!
//! Growth is capped to 3x on the first iteration; shrinking (down to 1/3x)
//! is only allowed after the second. Population growth never exceeds 10x
//! per iteration and never falls below the significance floor.

use crate::constants::{GROWTH_CAP_MULTIPLIER, POPULATION_CEILING_MULTIPLIER};
use crate::statistics::RunStatistics;

/// Next iteration's sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeDecision {
    /// Invocations per timed batch.
    pub batch_size: usize,
    /// Batches per population.
    pub population: usize,
    /// The batch size was held below its target by a growth cap.
    pub batch_capped: bool,
    /// The population was held below its target by a growth cap or ceiling.
    pub population_capped: bool,
}

impl SizeDecision {
    /// Whether either size fell short of its target.
    ///
    /// Results from such an iteration are not accepted as converged.
    pub fn capped(&self) -> bool {
        self.batch_capped || self.population_capped
    }
}

/// Feedback controller for batch and population sizes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeAdapter {
    /// Clock read-pair overhead in ticks.
    clock_time: f64,
    /// `clock_overhead_perc / 100`; zero disables batch adaptation.
    clock_overhead: f64,
    /// Zero disables population adaptation.
    confidence_sigma: f64,
    /// `stddev_perc / 100`.
    stddev_ratio: f64,
    /// Significance floor for populations.
    min_population: usize,
}

impl SizeAdapter {
    /// Create an adapter.
    ///
    /// `clock_time` is in the same units as the statistics passed to
    /// [`next_sizes`](Self::next_sizes). Percentages are given as percent.
    pub fn new(
        clock_time: f64,
        clock_overhead_perc: f64,
        confidence_sigma: f64,
        stddev_perc: f64,
        min_population: usize,
    ) -> Self {
        Self {
            clock_time,
            clock_overhead: clock_overhead_perc / 100.0,
            confidence_sigma,
            stddev_ratio: stddev_perc / 100.0,
            min_population,
        }
    }

    /// Compute sizes for the iteration after `iteration` (1-based count of
    /// completed iterations).
    pub fn next_sizes(
        &self,
        iteration: usize,
        batch_size: usize,
        population: usize,
        stats: &RunStatistics,
    ) -> SizeDecision {
        let (batch_size, batch_capped) = self.next_batch_size(iteration, batch_size, stats);
        let (population, population_capped) = self.next_population(iteration, population, stats);
        SizeDecision {
            batch_size,
            population,
            batch_capped,
            population_capped,
        }
    }

    /// Batch-size controller. Returns the new size and whether it was capped
    /// below its target.
    pub fn next_batch_size(&self, iteration: usize, prev: usize, stats: &RunStatistics) -> (usize, bool) {
        if self.clock_overhead == 0.0 {
            return (prev, false);
        }

        let mut mean = stats.mean_all - stats.sigma_all;
        if mean <= 0.0 {
            mean = stats.mean_all;
        }
        // Nothing measurable to size against
        if mean <= 0.0 || !mean.is_finite() {
            return (prev, false);
        }

        let target = self.clock_time / (mean * self.clock_overhead);
        let (next, capped) = apply_growth_policy(iteration, prev, target, None);
        (next.max(1), capped)
    }

    /// Population-size controller. Returns the new size and whether it was
    /// capped below its target.
    pub fn next_population(&self, iteration: usize, prev: usize, stats: &RunStatistics) -> (usize, bool) {
        if self.confidence_sigma == 0.0 {
            return (prev.max(self.min_population), false);
        }

        let width = stats.mean_all * self.stddev_ratio;
        let spread = 2.0 * self.confidence_sigma * stats.sigma_all;
        let target = if width > 0.0 {
            (spread / width).powi(2) + stats.outliers() as f64
        } else if spread > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let ceiling = prev as f64 * POPULATION_CEILING_MULTIPLIER;
        let (next, capped) = apply_growth_policy(iteration, prev, target, Some(ceiling));
        (next.max(self.min_population), capped)
    }
}

/// Shared growth policy.
///
/// - iteration 1: grow toward `target`, at most 3x
/// - after iteration 2: shrink to 1/3x when `target` is below that
/// - otherwise grow toward `target`, bounded by `ceiling` if given
fn apply_growth_policy(iteration: usize, prev: usize, target: f64, ceiling: Option<f64>) -> (usize, bool) {
    let prev_f = prev as f64;
    let max = prev_f * GROWTH_CAP_MULTIPLIER;
    let min = prev_f / GROWTH_CAP_MULTIPLIER;

    if target > max && iteration <= 1 {
        (max.ceil() as usize, true)
    } else if target < min && iteration > 2 {
        (min.ceil() as usize, false)
    } else if let Some(ceiling) = ceiling.filter(|&c| target > c) {
        (ceiling.ceil() as usize, true)
    } else if target > prev_f {
        (target.ceil() as usize, false)
    } else {
        (prev, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn stats(mean_all: f64, sigma_all: f64, outliers: usize) -> RunStatistics {
        RunStatistics {
            count: 100 - outliers,
            count_all: 100,
            mean: mean_all,
            mean_all,
            sigma: sigma_all,
            sigma_all,
            min: mean_all,
            max: mean_all,
            min_all: mean_all,
            max_all: mean_all,
        }
    }

    #[test]
    fn test_batch_first_iteration_capped() {
        // target = 100 / (10 * 0.5) = 20
        let adapter = SizeAdapter::new(100.0, 50.0, 2.0, 1.0, 30);
        let (batch, capped) = adapter.next_batch_size(1, 4, &stats(10.0, 0.0, 0));
        assert_eq!(batch, 12);
        assert!(capped);
    }

    #[test]
    fn test_batch_grows_unbounded_later() {
        let adapter = SizeAdapter::new(100.0, 50.0, 2.0, 1.0, 30);
        let (batch, capped) = adapter.next_batch_size(2, 2, &stats(10.0, 0.0, 0));
        assert_eq!(batch, 20);
        assert!(!capped);
    }

    #[test]
    fn test_batch_conservative_mean() {
        // mean - sigma = 5, target = 100 / (5 * 0.5) = 40
        let adapter = SizeAdapter::new(100.0, 50.0, 2.0, 1.0, 30);
        let (batch, _) = adapter.next_batch_size(2, 1, &stats(10.0, 5.0, 0));
        assert_eq!(batch, 40);
        // sigma larger than the mean falls back to the mean
        let (batch, _) = adapter.next_batch_size(2, 1, &stats(10.0, 50.0, 0));
        assert_eq!(batch, 20);
        // so does a conservative mean of exactly zero
        let (batch, _) = adapter.next_batch_size(2, 1, &stats(10.0, 10.0, 0));
        assert_eq!(batch, 20);
    }

    #[test]
    fn test_batch_shrinks_only_after_second_iteration() {
        let adapter = SizeAdapter::new(1.0, 50.0, 2.0, 1.0, 30);
        assert_eq!(adapter.next_batch_size(2, 9_000, &stats(10.0, 0.0, 0)), (9_000, false));
        assert_eq!(adapter.next_batch_size(3, 9_000, &stats(10.0, 0.0, 0)), (3_000, false));
    }

    #[test]
    fn test_batch_disabled() {
        let adapter = SizeAdapter::new(100.0, 0.0, 2.0, 1.0, 30);
        assert_eq!(adapter.next_batch_size(1, 7, &stats(10.0, 0.0, 0)), (7, false));
    }

    #[test]
    fn test_population_formula() {
        // width = 100 * 0.5 = 50; (2 * 2 * 25 / 50)^2 = 4, plus 4 outliers -> floor 30
        let adapter = SizeAdapter::new(0.0, 0.1, 2.0, 50.0, 30);
        assert_eq!(adapter.next_population(2, 30, &stats(100.0, 25.0, 4)), (30, false));

        // (2 * 2 * 125 / 50)^2 = 100, plus 4 outliers
        assert_eq!(adapter.next_population(2, 60, &stats(100.0, 125.0, 4)), (104, false));
    }

    #[test]
    fn test_population_ceiling() {
        // (2 * 2 * 1250 / 50)^2 = 10_000 > 10 * 30
        let adapter = SizeAdapter::new(0.0, 0.1, 2.0, 50.0, 30);
        assert_eq!(adapter.next_population(2, 30, &stats(100.0, 1250.0, 0)), (300, true));
        assert_eq!(adapter.next_population(1, 30, &stats(100.0, 1250.0, 0)), (90, true));
    }

    #[test]
    fn test_population_disabled() {
        let adapter = SizeAdapter::new(0.0, 0.1, 0.0, 1.0, 30);
        assert_eq!(adapter.next_population(2, 45, &stats(100.0, 50.0, 0)), (45, false));
    }

    #[test]
    fn test_decision_capped() {
        let adapter = SizeAdapter::new(100.0, 50.0, 2.0, 1.0, 30);
        let decision = adapter.next_sizes(1, 1, 30, &stats(10.0, 0.0, 0));
        assert!(decision.batch_capped);
        assert!(!decision.population_capped);
        assert!(decision.capped());
    }

    proptest! {
        #[test]
        fn sizes_respect_floors_and_caps(
            iteration in 1usize..6,
            batch in 1usize..10_000,
            population in 1usize..10_000,
            mean in 0.1f64..1e6,
            sigma in 0.0f64..1e6,
            outliers in 0usize..50,
            clock_time in 0.0f64..1e4,
        ) {
            let adapter = SizeAdapter::new(clock_time, 0.1, 2.0, 1.0, 30);
            let d = adapter.next_sizes(iteration, batch, population, &stats(mean, sigma, outliers));

            prop_assert!(d.batch_size >= 1);
            prop_assert!(d.population >= 30);
            prop_assert!(d.population <= (population * 10).max(30));
            if iteration == 1 {
                prop_assert!(d.batch_size <= batch * 3);
                prop_assert!(d.population <= (population * 3).max(30));
            }
            if iteration <= 2 {
                prop_assert!(d.batch_size >= batch);
            }
        }
    }
}
