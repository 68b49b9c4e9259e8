//! Named defaults for benchmark parameters.
//!
//! These are policy values, not correctness requirements. They are the
//! values `Parameters::default()` and the presets fall back to when a
//! field is not set explicitly.

use std::time::Duration;

/// Target ratio of clock overhead to batch duration, in percent (0.1%).
pub const DEFAULT_CLOCK_OVERHEAD_PERC: f64 = 0.1;

/// Confidence multiplier used to size populations (2σ ≈ 95.45%).
pub const DEFAULT_CONFIDENCE_SIGMA: f64 = 2.0;

/// Outlier rejection band (4σ ≈ 99.99%).
pub const DEFAULT_CONFIDENCE_OUTLIER_SIGMA: f64 = 4.0;

/// Target relative standard deviation of the mean, in percent.
pub const DEFAULT_STDDEV_PERC: f64 = 1.0;

/// Wall-clock budget for one convergence search.
pub const DEFAULT_EXPERIMENT_TIMEOUT: Duration = Duration::from_secs(300);

/// Untimed batches run before every population.
pub const DEFAULT_WARMUP_BATCH_GROUP_SIZE: usize = 0;

/// Initial population size.
pub const DEFAULT_BATCH_GROUP_SIZE: usize = 30;

/// Smallest retained population considered statistically significant.
pub const DEFAULT_BATCH_GROUP_MIN_SIZE: usize = 30;

/// Untimed workload invocations before every timed batch.
pub const DEFAULT_WARMUP_BATCH_SIZE: usize = 0;

/// Initial number of invocations timed together.
pub const DEFAULT_BATCH_SIZE: usize = 1;

/// Calibration confidence (3σ ≈ 99.73%).
pub const CALIBRATION_CONFIDENCE_SIGMA: f64 = 3.0;

/// Calibration per-batch warmup.
pub const CALIBRATION_WARMUP_BATCH_SIZE: usize = 1_000;

/// Calibration batch seed. Clock reads are cheap, so batches start large.
pub const CALIBRATION_BATCH_SIZE: usize = 10_000;

/// Calibration gets a shorter, fixed budget than real runs.
pub const CALIBRATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Maximum growth (and shrink) factor applied per iteration.
pub const GROWTH_CAP_MULTIPLIER: f64 = 3.0;

/// Absolute ceiling on population growth per iteration, as a multiple of
/// the previous population size.
pub const POPULATION_CEILING_MULTIPLIER: f64 = 10.0;

/// Minimum number of iterations before a result may be accepted as converged.
pub const MIN_CONVERGED_ITERATIONS: usize = 2;
