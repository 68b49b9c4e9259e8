//! The convergence search.
//!
//! Each iteration measures one population of batches, filters outliers,
//! and either accepts the population or adapts batch and population sizes
//! for the next one:
//!
//! ```text
//! Bootstrapping ──▶ Sampling ──┬──▶ Converged
//!                      ▲       │
//!                      └───────┼──▶ TimedOut
//!                              ▼
//!                        (adapt sizes)
//! ```
//!
//! Before every iteration but the first, the cost of the next population is
//! predicted from the latest mean; if it would overrun the budget the search
//! stops with the best population seen so far.
//!
//! A population that retains no samples after outlier rejection ends the
//! search: the outlier band is too narrow for the workload and further
//! iterations cannot fix it.

use crate::config::Parameters;
use crate::constants::MIN_CONVERGED_ITERATIONS;
use crate::hooks::Hooks;
use crate::measurement::{BatchRunner, Clock, OutlierFilter};
use crate::result::Termination;
use crate::statistics::RunStatistics;
use crate::types::SampleRetention;

use super::sizing::SizeAdapter;
use super::state::{Candidate, Phase, SearchState};

/// What the controller is measuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// A user workload, with the clock overhead already known.
    #[default]
    Benchmark,
    /// The clock itself. The clock overhead tracks the latest mean.
    Calibration,
}

/// Result of one convergence search, in clock ticks.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Statistics of the reported population, per invocation.
    pub stats: RunStatistics,
    /// Batch size of the reported population.
    pub batch_size: usize,
    /// Populations measured.
    pub iterations: usize,
    /// Why the search stopped.
    pub termination: Termination,
    /// Normalized samples with outlier flags, if retained.
    pub samples: Option<Vec<(f64, bool)>>,
    /// Clock overhead in effect at the end of the search.
    pub clock_time_ns: f64,
    /// Ticks from the start to the end of the search.
    pub elapsed_ticks: u64,
}

impl Outcome {
    /// Whether the reported population is an accepted answer.
    pub fn converged(&self) -> bool {
        self.termination.is_converged()
    }
}

/// Drives iterations until convergence or timeout.
pub struct ConvergenceController<'c, 'h, C: Clock> {
    clock: &'c C,
    params: Parameters,
    hooks: Hooks<'h>,
    retention: SampleRetention,
    mode: Mode,
}

impl<'c, 'h, C: Clock> ConvergenceController<'c, 'h, C> {
    /// Controller with no hooks that discards samples.
    pub fn new(clock: &'c C, params: Parameters) -> Self {
        Self {
            clock,
            params,
            hooks: Hooks::default(),
            retention: SampleRetention::default(),
            mode: Mode::default(),
        }
    }

    /// Install observation hooks.
    pub fn hooks(mut self, hooks: Hooks<'h>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Set whether the reported population's samples are kept.
    pub fn retention(mut self, retention: SampleRetention) -> Self {
        self.retention = retention;
        self
    }

    /// Set what is being measured.
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Run the search against `func`.
    pub fn run<F, T>(mut self, func: &mut F) -> Outcome
    where
        F: FnMut() -> T,
    {
        let clock = self.clock;
        let runner = BatchRunner::new(clock);
        let filter = OutlierFilter::new(self.params.confidence_outlier_sigma);
        let budget = clock.ns_to_ticks(self.params.experiment_timeout.as_nanos() as f64);

        let mut p = self.params.clone();
        let mut buffer: Vec<f64> = Vec::with_capacity(p.batch_group_size);
        let mut state = SearchState::new();
        let mut phase = Phase::Bootstrapping;
        let mut accepted: Option<Candidate> = None;
        let mut single_shot = false;
        let mut predicted_mean: Option<f64> = None;
        let mut iterations = 0usize;

        let start = clock.now();

        while !phase.is_terminal() {
            if let Some(mean) = predicted_mean {
                let elapsed = clock.now().saturating_sub(start) as f64;
                if budget - elapsed < predicted_cost(mean, &p) {
                    tracing::warn!(
                        iterations,
                        elapsed_ns = clock.ticks_to_ns(elapsed),
                        "Timed out before reaching the precision target"
                    );
                    phase = Phase::TimedOut;
                    continue;
                }
            }

            let index = iterations;
            let population = p.batch_group_size;
            let batch_size = p.batch_size;
            resize_buffer(&mut buffer, population);

            self.hooks.iteration_start(index, population, batch_size);
            runner.warmup_group(p.warmup_batch_group_size, p.warmup_batch_size, batch_size, func);
            for (batch, slot) in buffer[..population].iter_mut().enumerate() {
                self.hooks.batch_start(index, batch, batch_size);
                let ticks = runner.run_batch(p.warmup_batch_size, batch_size, func);
                self.hooks.batch_stop(index, batch, batch_size);
                *slot = ticks as f64 / batch_size as f64;
            }
            self.hooks.iteration_stop(index, population, batch_size);

            let samples = &buffer[..population];
            let hooks = &mut self.hooks;
            let stats = filter.apply(samples, |i| hooks.batch_select(index, i, batch_size));
            iterations += 1;
            phase = Phase::Sampling;
            predicted_mean = Some(stats.mean_all);

            if self.mode == Mode::Calibration {
                p.clock_time_ns = clock.ticks_to_ns(stats.mean);
            }

            let width = stats.mean * p.stddev_perc / 100.0;
            tracing::debug!(
                iteration = index,
                batch_size,
                population,
                mean_ns = clock.ticks_to_ns(stats.mean),
                sigma_ns = clock.ticks_to_ns(stats.sigma),
                width_ns = clock.ticks_to_ns(width),
                outliers = stats.outliers(),
                "Population measured"
            );

            let candidate = Candidate {
                stats,
                batch_size,
                iteration: index,
                samples: self.retention.is_kept().then(|| {
                    let flags = filter.classify(samples, &stats);
                    samples.iter().copied().zip(flags).collect()
                }),
            };

            if stats.count == 0 {
                tracing::warn!(
                    iteration = index,
                    population,
                    confidence_outlier_sigma = p.confidence_outlier_sigma,
                    "Every sample was rejected as an outlier"
                );
                state.record(candidate);
                phase = Phase::Rejected;
                continue;
            }

            if p.stddev_perc == 0.0 {
                self.hooks.iteration_select(index, population, batch_size);
                accepted = Some(candidate);
                single_shot = true;
                phase = Phase::Converged;
                continue;
            }

            let adapter = SizeAdapter::new(
                clock.ns_to_ticks(p.clock_time_ns),
                p.clock_overhead_perc,
                p.confidence_sigma,
                p.stddev_perc,
                p.batch_group_min_size,
            );
            let decision = adapter.next_sizes(iterations, batch_size, population, &stats);
            let significant = stats.is_significant(p.batch_group_min_size);

            if significant
                && stats.sigma <= width
                && !decision.capped()
                && iterations >= MIN_CONVERGED_ITERATIONS
            {
                self.hooks.iteration_select(index, population, batch_size);
                accepted = Some(candidate);
                phase = Phase::Converged;
                continue;
            }

            if significant {
                if state.offer(candidate) {
                    self.hooks.iteration_select(index, population, batch_size);
                }
            } else {
                state.record(candidate);
            }

            p.batch_size = decision.batch_size;
            p.batch_group_size = decision.population;
        }

        let elapsed_ticks = clock.now().saturating_sub(start);
        let termination = match phase {
            Phase::Converged if single_shot => Termination::SingleShot,
            Phase::Converged => Termination::Converged,
            Phase::Rejected => Termination::NoRetainedSamples,
            _ => Termination::TimedOut,
        };
        let reported = accepted.or_else(|| state.into_result()).unwrap_or(Candidate {
            stats: RunStatistics::default(),
            batch_size: p.batch_size,
            iteration: 0,
            samples: None,
        });

        Outcome {
            stats: reported.stats,
            batch_size: reported.batch_size,
            iterations,
            termination,
            samples: reported.samples,
            clock_time_ns: p.clock_time_ns,
            elapsed_ticks,
        }
    }
}

/// Predicted ticks for the next population, warmup included.
fn predicted_cost(mean: f64, p: &Parameters) -> f64 {
    let batches = (p.warmup_batch_group_size + p.batch_group_size) as f64;
    let invocations = (p.warmup_batch_size + p.batch_size) as f64;
    mean * batches * invocations
}

/// Grow the buffer to `population`; release memory once it exceeds twice that.
fn resize_buffer(buffer: &mut Vec<f64>, population: usize) {
    if buffer.len() < population {
        buffer.resize(population, 0.0);
    } else if buffer.len() > population.saturating_mul(2) {
        buffer.truncate(population);
        buffer.shrink_to(population);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::SimulatedClock;
    use std::cell::{Cell, RefCell};
    use std::time::Duration;

    fn calibrated() -> Parameters {
        Parameters {
            clock_time_ns: 1.0,
            ..Parameters::default()
        }
    }

    #[test]
    fn test_zero_variance_converges_in_two_iterations() {
        let clock = SimulatedClock::new(0);
        let outcome = ConvergenceController::new(&clock, calibrated()).run(&mut || clock.advance(100));

        assert_eq!(outcome.termination, Termination::Converged);
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.stats.mean, 100.0);
        assert_eq!(outcome.stats.sigma, 0.0);
        assert_eq!(outcome.stats.count_all, 30);
        // first iteration grew the batch by the capped 3x
        assert_eq!(outcome.batch_size, 3);
    }

    #[test]
    fn test_single_shot() {
        let clock = SimulatedClock::new(0);
        let params = Parameters {
            stddev_perc: 0.0,
            ..calibrated()
        };
        let outcome = ConvergenceController::new(&clock, params).run(&mut || clock.advance(7));

        assert_eq!(outcome.termination, Termination::SingleShot);
        assert!(outcome.converged());
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.stats.mean, 7.0);
    }

    #[test]
    fn test_timeout_reports_first_population() {
        let clock = SimulatedClock::new(0);
        let params = Parameters {
            experiment_timeout: Duration::from_millis(1),
            ..calibrated()
        };
        let outcome = ConvergenceController::new(&clock, params).run(&mut || clock.advance(1_000_000));

        assert_eq!(outcome.termination, Termination::TimedOut);
        assert!(!outcome.converged());
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.stats.count_all, 30);
        assert_eq!(outcome.stats.mean, 1_000_000.0);
    }

    #[test]
    fn test_hook_sequence() {
        let clock = SimulatedClock::new(0);
        let starts = Cell::new(0);
        let batches = Cell::new(0);
        let selected = Cell::new(0);
        let chosen = Cell::new(0);
        let hooks = Hooks::new()
            .on_iteration_start(|_, _, _| starts.set(starts.get() + 1))
            .on_batch_stop(|_, _, _| batches.set(batches.get() + 1))
            .on_batch_select(|_, _, _| selected.set(selected.get() + 1))
            .on_iteration_select(|_, _, _| chosen.set(chosen.get() + 1));

        let outcome = ConvergenceController::new(&clock, calibrated())
            .hooks(hooks)
            .run(&mut || clock.advance(100));

        assert_eq!(outcome.iterations, 2);
        assert_eq!(starts.get(), 2);
        assert_eq!(batches.get(), 60);
        assert_eq!(selected.get(), 60);
        // best-so-far after the first population, accepted after the second
        assert_eq!(chosen.get(), 2);
    }

    #[test]
    fn test_samples_retained_with_flags() {
        let clock = SimulatedClock::new(0);
        let params = Parameters {
            stddev_perc: 0.0,
            ..calibrated()
        };
        let outcome = ConvergenceController::new(&clock, params)
            .retention(SampleRetention::Keep)
            .run(&mut || clock.advance(5));

        let samples = outcome.samples.unwrap_or_default();
        assert_eq!(samples.len(), 30);
        assert!(samples.iter().all(|&(d, outlier)| d == 5.0 && !outlier));
    }

    #[test]
    fn test_samples_discarded_by_default() {
        let clock = SimulatedClock::new(0);
        let outcome = ConvergenceController::new(&clock, calibrated()).run(&mut || clock.advance(5));
        assert!(outcome.samples.is_none());
    }

    #[test]
    fn test_calibration_mode_tracks_clock_time() {
        let clock = SimulatedClock::new(0);
        let outcome = ConvergenceController::new(&clock, Parameters::calibration())
            .mode(Mode::Calibration)
            .run(&mut || clock.advance(10));

        assert!(outcome.converged());
        assert_eq!(outcome.clock_time_ns, 10.0);
    }

    /// Even population split between 100 and 1000 ticks: every sample sits
    /// 450 ticks from the mean, outside a half-sigma band.
    fn alternating(clock: &SimulatedClock) -> impl FnMut() + '_ {
        let mut slow = false;
        move || {
            clock.advance(if slow { 1_000 } else { 100 });
            slow = !slow;
        }
    }

    #[test]
    fn test_all_outliers_never_accepted_in_single_shot() {
        let clock = SimulatedClock::new(0);
        let params = Parameters {
            stddev_perc: 0.0,
            confidence_outlier_sigma: 0.5,
            ..calibrated()
        };
        let chosen = Cell::new(0);
        let outcome = ConvergenceController::new(&clock, params)
            .hooks(Hooks::new().on_iteration_select(|_, _, _| chosen.set(chosen.get() + 1)))
            .run(&mut alternating(&clock));

        assert_eq!(outcome.termination, Termination::NoRetainedSamples);
        assert!(!outcome.converged());
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.stats.count, 0);
        assert_eq!(outcome.stats.count_all, 30);
        assert!((outcome.stats.mean_all - 550.0).abs() < 1e-9);
        assert_eq!(chosen.get(), 0);
    }

    #[test]
    fn test_all_outliers_stop_adaptive_search() {
        let clock = SimulatedClock::new(0);
        let params = Parameters {
            confidence_outlier_sigma: 0.5,
            experiment_timeout: Duration::from_millis(50),
            ..calibrated()
        };
        let outcome = ConvergenceController::new(&clock, params).run(&mut alternating(&clock));

        assert_eq!(outcome.termination, Termination::NoRetainedSamples);
        assert!(!outcome.converged());
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.stats.count, 0);
    }

    /// Three populations of fixed size 30 and batch size 1:
    /// - iteration 0: 1000/1010 alternating, the lowest sigma
    /// - iteration 1: 1000/1040 alternating, significant but noisier
    /// - iteration 2: one 1_000_000 spike rejected, leaving 29 identical
    ///   samples (sigma 0, below the significance floor)
    ///
    /// The spike's mean predicts a population that overruns the budget.
    #[test]
    fn test_timeout_reports_lowest_sigma_significant_population() {
        let clock = SimulatedClock::new(0);
        let params = Parameters {
            stddev_perc: 0.1,
            confidence_sigma: 0.0,
            clock_overhead_perc: 0.0,
            experiment_timeout: Duration::from_millis(2),
            ..calibrated()
        };
        let chosen = RefCell::new(Vec::new());
        let mut calls = 0u64;
        let outcome = ConvergenceController::new(&clock, params)
            .hooks(Hooks::new().on_iteration_select(|iteration, _, _| chosen.borrow_mut().push(iteration)))
            .run(&mut || {
                let position = calls % 30;
                let ticks = match calls / 30 {
                    0 => 1_000 + (position % 2) * 10,
                    1 => 1_000 + (position % 2) * 40,
                    _ if position == 0 => 1_000_000,
                    _ => 1_000,
                };
                clock.advance(ticks);
                calls += 1;
            });

        assert_eq!(outcome.termination, Termination::TimedOut);
        assert!(!outcome.converged());
        assert_eq!(outcome.iterations, 3);
        assert_eq!(outcome.stats.count, 30);
        assert!((outcome.stats.mean - 1_005.0).abs() < 1e-9);
        assert!((outcome.stats.sigma - (750.0f64 / 29.0).sqrt()).abs() < 1e-9);
        assert_eq!(outcome.stats.max, 1_010.0);
        assert_eq!(chosen.into_inner(), vec![0]);
    }

    #[test]
    fn test_iteration_select_receives_full_population() {
        let clock = SimulatedClock::new(0);
        let params = Parameters {
            stddev_perc: 0.0,
            batch_group_size: 40,
            confidence_outlier_sigma: 2.0,
            ..calibrated()
        };
        let chosen = Cell::new((0, 0, 0));
        let mut calls = 0u64;
        let outcome = ConvergenceController::new(&clock, params)
            .hooks(Hooks::new().on_iteration_select(|i, p, b| chosen.set((i, p, b))))
            .run(&mut || {
                clock.advance(if calls % 8 == 7 { 1_000 } else { 100 });
                calls += 1;
            });

        assert_eq!(outcome.stats.count, 35);
        assert_eq!(chosen.get(), (0, 40, 1));
    }

    #[test]
    fn test_buffer_policy() {
        let mut buffer = Vec::new();
        resize_buffer(&mut buffer, 30);
        assert_eq!(buffer.len(), 30);
        resize_buffer(&mut buffer, 20);
        assert_eq!(buffer.len(), 30);
        resize_buffer(&mut buffer, 10);
        assert_eq!(buffer.len(), 10);
    }
}
