//! Configuration for adaptive benchmark runs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::Error;

/// Parameters controlling one benchmark run.
///
/// The controller copies these and adapts `batch_size` and
/// `batch_group_size` locally; the caller's value is never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    /// Target relative standard deviation of the mean, in percent
    /// (default: 1.0).
    ///
    /// Zero runs exactly one population and accepts it without adaptation.
    pub stddev_perc: f64,

    /// Sigma multiplier used to size the population (default: 2.0).
    ///
    /// Zero keeps `batch_group_size` fixed.
    pub confidence_sigma: f64,

    /// Sigma multiplier defining the outlier band (default: 4.0).
    pub confidence_outlier_sigma: f64,

    /// Wall-clock budget for the whole convergence search (default: 300s).
    pub experiment_timeout: Duration,

    /// Untimed batches run before every population (default: 0).
    pub warmup_batch_group_size: usize,

    /// Initial population size (default: 30). Adapted between iterations.
    pub batch_group_size: usize,

    /// Retained populations smaller than this are not trusted (default: 30).
    pub batch_group_min_size: usize,

    /// Cost of one clock read pair in nanoseconds (default: 0).
    ///
    /// Zero means the clock has not been calibrated yet; the benchmark
    /// calibrates it before running.
    pub clock_time_ns: f64,

    /// Target ratio of clock overhead to batch duration, in percent
    /// (default: 0.1).
    ///
    /// Zero keeps `batch_size` fixed.
    pub clock_overhead_perc: f64,

    /// Untimed workload invocations before every timed batch (default: 0).
    pub warmup_batch_size: usize,

    /// Initial number of invocations timed together (default: 1).
    /// Adapted between iterations.
    pub batch_size: usize,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            stddev_perc: DEFAULT_STDDEV_PERC,
            confidence_sigma: DEFAULT_CONFIDENCE_SIGMA,
            confidence_outlier_sigma: DEFAULT_CONFIDENCE_OUTLIER_SIGMA,
            experiment_timeout: DEFAULT_EXPERIMENT_TIMEOUT,
            warmup_batch_group_size: DEFAULT_WARMUP_BATCH_GROUP_SIZE,
            batch_group_size: DEFAULT_BATCH_GROUP_SIZE,
            batch_group_min_size: DEFAULT_BATCH_GROUP_MIN_SIZE,
            clock_time_ns: 0.0,
            clock_overhead_perc: DEFAULT_CLOCK_OVERHEAD_PERC,
            warmup_batch_size: DEFAULT_WARMUP_BATCH_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl Parameters {
    /// Faster, less precise preset for smoke tests.
    ///
    /// Settings:
    /// - 5% target relative standard deviation (vs 1% default)
    /// - 10s timeout (vs 300s default)
    pub fn quick() -> Self {
        Self {
            stddev_perc: 5.0,
            experiment_timeout: Duration::from_secs(10),
            ..Self::default()
        }
    }

    /// Preset used to measure the clock's own overhead.
    ///
    /// Settings:
    /// - 3σ confidence (vs 2σ default)
    /// - 1,000 warmup invocations per batch
    /// - 10,000 invocations per batch seed
    /// - 60s timeout
    pub fn calibration() -> Self {
        Self {
            confidence_sigma: CALIBRATION_CONFIDENCE_SIGMA,
            warmup_batch_size: CALIBRATION_WARMUP_BATCH_SIZE,
            batch_size: CALIBRATION_BATCH_SIZE,
            experiment_timeout: CALIBRATION_TIMEOUT,
            ..Self::default()
        }
    }

    /// Whether `clock_time_ns` has been filled in.
    pub fn is_calibrated(&self) -> bool {
        self.clock_time_ns > 0.0
    }

    /// Return a copy with the given clock overhead.
    pub fn with_clock_time(&self, clock_time_ns: f64) -> Self {
        Self {
            clock_time_ns,
            ..self.clone()
        }
    }

    /// Check every field against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for the first field that is
    /// negative, non-finite, or zero where a positive value is required.
    pub fn validate(&self) -> Result<(), Error> {
        non_negative("stddev_perc", self.stddev_perc)?;
        non_negative("confidence_sigma", self.confidence_sigma)?;
        non_negative("confidence_outlier_sigma", self.confidence_outlier_sigma)?;
        non_negative("clock_time_ns", self.clock_time_ns)?;
        non_negative("clock_overhead_perc", self.clock_overhead_perc)?;

        // With a zero band every sample is an outlier.
        if self.confidence_outlier_sigma == 0.0 {
            return Err(positive_required("confidence_outlier_sigma"));
        }
        if self.experiment_timeout.is_zero() {
            return Err(positive_required("experiment_timeout"));
        }
        if self.batch_group_size == 0 {
            return Err(positive_required("batch_group_size"));
        }
        if self.batch_group_min_size == 0 {
            return Err(positive_required("batch_group_min_size"));
        }
        if self.batch_size == 0 {
            return Err(positive_required("batch_size"));
        }

        if self.batch_group_size < DEFAULT_BATCH_GROUP_MIN_SIZE {
            tracing::warn!(
                batch_group_size = self.batch_group_size,
                "population seed is not statistically significant (< {})",
                DEFAULT_BATCH_GROUP_MIN_SIZE
            );
        }

        Ok(())
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), Error> {
    if !value.is_finite() {
        return Err(Error::InvalidParameter {
            name,
            reason: format!("must be finite, got {}", value),
        });
    }
    if value < 0.0 {
        return Err(Error::InvalidParameter {
            name,
            reason: format!("cannot be negative, got {}", value),
        });
    }
    Ok(())
}

fn positive_required(name: &'static str) -> Error {
    Error::InvalidParameter {
        name,
        reason: "must be positive".to_string(),
    }
}
