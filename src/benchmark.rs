//! Main `Benchmark` entry point and builder.

use crate::adaptive::{Calibrator, ConvergenceController};
use crate::config::Parameters;
use crate::error::Error;
use crate::hooks::Hooks;
use crate::measurement::{Clock, ClockSpec};
use crate::result::{RunResult, Termination};
use crate::types::SampleRetention;

/// Main entry point for benchmarking.
///
/// Use the builder pattern to configure and run a benchmark.
///
/// # Example
///
/// ```ignore
/// use timing_engine::Benchmark;
///
/// let result = Benchmark::new()
///     .stddev_perc(0.5)
///     .experiment_timeout(Duration::from_secs(30))
///     .run(|| my_function(black_box(&input)))?;
///
/// println!("{:.2} ns ± {:.2}", result.mean_ns, result.sigma_ns);
/// ```
///
/// # Calibration
///
/// Unless a clock overhead is set with [`clock_time_ns`](Self::clock_time_ns),
/// the overhead of the selected clock is measured before the run. Reuse
/// the result of [`crate::calibrate`] to skip this across many benchmarks.
///
/// # Clock Selection
///
/// The monotonic wall clock is used by default. The hardware cycle counter
/// can be requested explicitly:
///
/// ```ignore
/// use timing_engine::{Benchmark, ClockSpec};
///
/// let result = Benchmark::new()
///     .clock(ClockSpec::CycleCounter)
///     .run(|| work())?;
/// ```
#[derive(Debug, Default)]
pub struct Benchmark<'h> {
    params: Parameters,
    clock_spec: ClockSpec,
    retention: SampleRetention,
    hooks: Hooks<'h>,
}

impl<'h> Benchmark<'h> {
    /// Create with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with the fast, less precise preset.
    ///
    /// See [`Parameters::quick`].
    pub fn quick() -> Self {
        Self::with_parameters(Parameters::quick())
    }

    /// Create from a complete parameter set.
    pub fn with_parameters(params: Parameters) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    /// Set the target relative standard deviation of the mean, in percent.
    ///
    /// Zero measures a single population without adaptation.
    pub fn stddev_perc(mut self, perc: f64) -> Self {
        self.params.stddev_perc = perc;
        self
    }

    /// Set the confidence multiplier used to size populations.
    ///
    /// Zero keeps the population size fixed.
    pub fn confidence_sigma(mut self, sigma: f64) -> Self {
        self.params.confidence_sigma = sigma;
        self
    }

    /// Set the outlier band half-width, in multiples of sigma.
    pub fn confidence_outlier_sigma(mut self, sigma: f64) -> Self {
        self.params.confidence_outlier_sigma = sigma;
        self
    }

    /// Set the wall-clock budget for the search.
    pub fn experiment_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.params.experiment_timeout = timeout;
        self
    }

    /// Set the number of untimed batches before each population.
    pub fn warmup_batch_group_size(mut self, n: usize) -> Self {
        self.params.warmup_batch_group_size = n;
        self
    }

    /// Set the initial population size.
    pub fn batch_group_size(mut self, n: usize) -> Self {
        self.params.batch_group_size = n;
        self
    }

    /// Set the smallest retained population considered significant.
    pub fn batch_group_min_size(mut self, n: usize) -> Self {
        self.params.batch_group_min_size = n;
        self
    }

    /// Set the clock overhead in nanoseconds, skipping calibration.
    pub fn clock_time_ns(mut self, ns: f64) -> Self {
        self.params.clock_time_ns = ns;
        self
    }

    /// Set the target clock overhead relative to a batch, in percent.
    ///
    /// Zero keeps the batch size fixed.
    pub fn clock_overhead_perc(mut self, perc: f64) -> Self {
        self.params.clock_overhead_perc = perc;
        self
    }

    /// Set the number of untimed invocations before each timed batch.
    pub fn warmup_batch_size(mut self, n: usize) -> Self {
        self.params.warmup_batch_size = n;
        self
    }

    /// Set the initial batch size.
    pub fn batch_size(mut self, n: usize) -> Self {
        self.params.batch_size = n;
        self
    }

    /// Select the clock.
    pub fn clock(mut self, spec: ClockSpec) -> Self {
        self.clock_spec = spec;
        self
    }

    /// Use the hardware cycle counter.
    pub fn cycle_counter(self) -> Self {
        self.clock(ClockSpec::CycleCounter)
    }

    /// Attach per-batch samples to the result.
    pub fn retain_samples(mut self) -> Self {
        self.retention = SampleRetention::Keep;
        self
    }

    /// Set whether per-batch samples are attached to the result.
    pub fn retention(mut self, retention: SampleRetention) -> Self {
        self.retention = retention;
        self
    }

    /// Install observation hooks.
    pub fn hooks(mut self, hooks: Hooks<'h>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Get the current parameters.
    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    /// Run the benchmark with the selected clock.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidParameter`] for an invalid parameter set
    /// - clock selection errors from [`ClockSpec::create_clock`]
    /// - [`Error::CalibrationDidNotConverge`] if the clock overhead had to be
    ///   measured and the measurement did not converge
    /// - [`Error::InvalidParameter`] for `confidence_outlier_sigma` if a
    ///   population retained no samples after outlier rejection
    ///
    /// A run that times out is not an error; see [`RunResult::converged`].
    pub fn run<F, T>(self, workload: F) -> Result<RunResult, Error>
    where
        F: FnMut() -> T,
    {
        let clock = self.clock_spec.create_clock()?;
        self.run_with_clock(&clock, workload)
    }

    /// Run the benchmark against a caller-supplied clock.
    pub fn run_with_clock<C, F, T>(self, clock: &C, mut workload: F) -> Result<RunResult, Error>
    where
        C: Clock,
        F: FnMut() -> T,
    {
        self.params.validate()?;
        clock.check()?;

        let params = if self.params.is_calibrated() {
            self.params
        } else {
            Calibrator::new(clock).calibrate(&self.params)?
        };

        tracing::info!(
            clock = clock.name(),
            clock_time_ns = params.clock_time_ns,
            stddev_perc = params.stddev_perc,
            "Executing benchmark"
        );

        let outlier_sigma = params.confidence_outlier_sigma;
        let outcome = ConvergenceController::new(clock, params)
            .hooks(self.hooks)
            .retention(self.retention)
            .run(&mut workload);

        if outcome.termination == Termination::NoRetainedSamples {
            return Err(Error::InvalidParameter {
                name: "confidence_outlier_sigma",
                reason: format!("{outlier_sigma} sigma band rejected every sample of a population"),
            });
        }

        Ok(RunResult::from_outcome(clock, outcome))
    }
}

/// Benchmark `workload` with default parameters and the wall clock.
///
/// Shorthand for `Benchmark::new().run(workload)`.
pub fn run<F, T>(workload: F) -> Result<RunResult, Error>
where
    F: FnMut() -> T,
{
    Benchmark::new().run(workload)
}

/// Benchmark `workload` with the given parameters and the wall clock.
pub fn run_with<F, T>(params: Parameters, workload: F) -> Result<RunResult, Error>
where
    F: FnMut() -> T,
{
    Benchmark::with_parameters(params).run(workload)
}

/// Measure the wall clock's overhead and return default parameters with it
/// filled in.
pub fn calibrate() -> Result<Parameters, Error> {
    let clock = ClockSpec::default().create_clock()?;
    Calibrator::new(&clock).calibrate(&Parameters::default())
}
