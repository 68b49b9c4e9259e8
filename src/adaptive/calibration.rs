//! Clock overhead calibration.
//!
//! Runs the convergence search on a workload that reads the clock twice,
//! which measures the cost of one timing bracket. The resulting mean is the
//! `clock_time_ns` that batch sizing divides by.

use std::hint::black_box;

use crate::config::Parameters;
use crate::error::Error;
use crate::measurement::Clock;

use super::loop_runner::{ConvergenceController, Mode};

/// Measured clock overhead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Cost of one pair of clock reads, in nanoseconds.
    pub clock_time_ns: f64,
    /// Standard deviation of the measurement, in nanoseconds.
    pub sigma_ns: f64,
    /// Batch size of the accepted population.
    pub batch_size: usize,
    /// Populations measured.
    pub iterations: usize,
}

/// Measures the overhead of reading a clock.
#[derive(Debug)]
pub struct Calibrator<'c, C: Clock> {
    clock: &'c C,
    params: Parameters,
}

impl<'c, C: Clock> Calibrator<'c, C> {
    /// Calibrator using [`Parameters::calibration`].
    pub fn new(clock: &'c C) -> Self {
        Self::with_parameters(clock, Parameters::calibration())
    }

    /// Calibrator with custom search parameters.
    pub fn with_parameters(clock: &'c C, params: Parameters) -> Self {
        Self { clock, params }
    }

    /// Run the calibration search.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidParameter`] if the search parameters are invalid
    /// - the clock's own [`check`](Clock::check) error
    /// - [`Error::CalibrationDidNotConverge`] if the search timed out
    pub fn measure(&self) -> Result<Calibration, Error> {
        self.params.validate()?;
        self.clock.check()?;

        tracing::info!(clock = self.clock.name(), "Calibrating clock overhead");

        let clock = self.clock;
        let mut read_pair = || {
            black_box(clock.now());
            black_box(clock.now())
        };
        let outcome = ConvergenceController::new(clock, self.params.clone())
            .mode(Mode::Calibration)
            .run(&mut read_pair);

        if !outcome.converged() {
            return Err(Error::CalibrationDidNotConverge {
                iterations: outcome.iterations,
                batches_all: outcome.stats.count_all,
                batch_size: outcome.batch_size,
            });
        }

        let calibration = Calibration {
            clock_time_ns: clock.ticks_to_ns(outcome.stats.mean),
            sigma_ns: clock.ticks_to_ns(outcome.stats.sigma),
            batch_size: outcome.batch_size,
            iterations: outcome.iterations,
        };
        tracing::debug!(
            clock_time_ns = calibration.clock_time_ns,
            sigma_ns = calibration.sigma_ns,
            iterations = calibration.iterations,
            "Clock overhead calibrated"
        );
        Ok(calibration)
    }

    /// Return `params` with `clock_time_ns` set to the measured overhead.
    pub fn calibrate(&self, params: &Parameters) -> Result<Parameters, Error> {
        let calibration = self.measure()?;
        Ok(params.with_clock_time(calibration.clock_time_ns))
    }
}
