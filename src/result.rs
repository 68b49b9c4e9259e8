//! Benchmark result types.

use serde::{Deserialize, Serialize};

use crate::adaptive::Outcome;
use crate::measurement::Clock;
use crate::types::SampleRecord;

/// Result of one benchmark run. All durations are per workload invocation,
/// in nanoseconds.
///
/// The unsuffixed statistics cover the samples retained after outlier
/// rejection; the `_all` statistics cover the whole population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Mean of retained samples.
    pub mean_ns: f64,
    /// Standard deviation of retained samples.
    pub sigma_ns: f64,
    /// Smallest retained sample.
    pub min_ns: f64,
    /// Largest retained sample.
    pub max_ns: f64,
    /// Retained batches.
    pub batches: usize,

    /// Mean of all samples.
    pub mean_all_ns: f64,
    /// Standard deviation of all samples.
    pub sigma_all_ns: f64,
    /// Smallest sample.
    pub min_all_ns: f64,
    /// Largest sample.
    pub max_all_ns: f64,
    /// All batches in the population.
    pub batches_all: usize,

    /// Whether the precision target was reached (or a single shot was
    /// requested). A `false` here means the run timed out and the numbers
    /// are the best population seen so far.
    pub converged: bool,
    /// Invocations per batch in the reported population.
    pub batch_size: usize,
    /// Populations measured.
    pub iterations: usize,
    /// Per-batch samples of the reported population, when requested.
    pub samples: Option<Vec<SampleRecord>>,

    /// Run metadata.
    pub metadata: Metadata,
}

/// How the search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// The precision target was met.
    Converged,
    /// Adaptation was disabled; the first population was reported.
    SingleShot,
    /// The time budget ran out first.
    TimedOut,
    /// Every sample of a population fell outside the outlier band, so no
    /// mean could be reported.
    NoRetainedSamples,
}

impl Termination {
    /// Whether the reported population can be trusted as the answer.
    pub fn is_converged(self) -> bool {
        matches!(self, Termination::Converged | Termination::SingleShot)
    }
}

/// Metadata for debugging and analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Clock used for timing.
    pub clock: String,
    /// Clock ticks per nanosecond.
    pub ticks_per_ns: f64,
    /// Overhead of one clock read pair, in nanoseconds.
    pub clock_time_ns: f64,
    /// Total runtime of the search in seconds, calibration excluded.
    pub runtime_secs: f64,
    /// How the search stopped.
    pub termination: Termination,
}

impl RunResult {
    pub(crate) fn from_outcome<C: Clock>(clock: &C, outcome: Outcome) -> Self {
        let ns = |ticks: f64| clock.ticks_to_ns(ticks);
        let converged = outcome.converged();
        let stats = &outcome.stats;

        let samples = outcome.samples.map(|samples| {
            samples
                .into_iter()
                .map(|(ticks, is_outlier)| SampleRecord {
                    duration_ns: ns(ticks),
                    is_outlier,
                })
                .collect()
        });

        Self {
            mean_ns: ns(stats.mean),
            sigma_ns: ns(stats.sigma),
            min_ns: ns(stats.min),
            max_ns: ns(stats.max),
            batches: stats.count,
            mean_all_ns: ns(stats.mean_all),
            sigma_all_ns: ns(stats.sigma_all),
            min_all_ns: ns(stats.min_all),
            max_all_ns: ns(stats.max_all),
            batches_all: stats.count_all,
            converged,
            batch_size: outcome.batch_size,
            iterations: outcome.iterations,
            samples,
            metadata: Metadata {
                clock: clock.name().to_string(),
                ticks_per_ns: clock.ticks_per_ns(),
                clock_time_ns: outcome.clock_time_ns,
                runtime_secs: ns(outcome.elapsed_ticks as f64) / 1e9,
                termination: outcome.termination,
            },
        }
    }

    /// Divide every duration by `factor`.
    ///
    /// For workloads that unroll `factor` repetitions of the operation of
    /// interest inside one invocation.
    pub fn scale(&self, factor: u64) -> Self {
        let f = factor.max(1) as f64;
        let mut scaled = self.clone();
        for value in [
            &mut scaled.mean_ns,
            &mut scaled.sigma_ns,
            &mut scaled.min_ns,
            &mut scaled.max_ns,
            &mut scaled.mean_all_ns,
            &mut scaled.sigma_all_ns,
            &mut scaled.min_all_ns,
            &mut scaled.max_all_ns,
        ] {
            *value /= f;
        }
        if let Some(samples) = scaled.samples.as_mut() {
            for sample in samples {
                sample.duration_ns /= f;
            }
        }
        scaled
    }

    /// Retained standard deviation relative to the retained mean, in percent.
    pub fn relative_sigma_perc(&self) -> f64 {
        if self.mean_ns == 0.0 {
            0.0
        } else {
            self.sigma_ns / self.mean_ns * 100.0
        }
    }

    /// Batches rejected as outliers.
    pub fn outliers(&self) -> usize {
        self.batches_all - self.batches
    }
}
