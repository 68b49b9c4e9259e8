//! Error types for benchmark runs.
//!
//! Only unrecoverable conditions are errors. A run that fails to converge
//! before its timeout is not an error: it returns a result with
//! `converged == false`.

/// Fatal error raised by configuration, calibration, clock selection or
/// result formatting.
#[derive(Debug)]
pub enum Error {
    /// A parameter is negative, non-finite, or zero where a positive value
    /// is required.
    InvalidParameter {
        /// Name of the offending field.
        name: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The clock overhead calibration run did not converge.
    ///
    /// Adaptive batch sizing depends on the clock overhead, so there is no
    /// meaningful fallback.
    CalibrationDidNotConverge {
        /// Iterations run before the calibration timed out.
        iterations: usize,
        /// Population size (including outliers) of the last iteration.
        batches_all: usize,
        /// Batch size of the last iteration.
        batch_size: usize,
    },

    /// The selected clock cannot be used on this platform.
    ClockUnsupported {
        /// Clock name.
        clock: &'static str,
        /// Why it is unavailable.
        reason: String,
    },

    /// The hardware counter does not tick at a constant rate, so cycle
    /// counts cannot be converted to time.
    NonInvariantCounter,

    /// A result that did not converge was passed to a formatter that
    /// requires converged results.
    NotConverged {
        /// Population size (including outliers) of the reported result.
        batches_all: usize,
        /// Batch size of the reported result.
        batch_size: usize,
    },

    /// Writing formatted output failed.
    Io(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidParameter { name, reason } => {
                write!(f, "invalid parameter '{}': {}", name, reason)
            }
            Self::CalibrationDidNotConverge {
                iterations,
                batches_all,
                batch_size,
            } => write!(
                f,
                "clock calibration did not converge after {} iterations \
                 (last population {} batches of {})",
                iterations, batches_all, batch_size
            ),
            Self::ClockUnsupported { clock, reason } => {
                write!(f, "clock '{}' is not supported: {}", clock, reason)
            }
            Self::NonInvariantCounter => write!(
                f,
                "cycle counter does not have a constant frequency"
            ),
            Self::NotConverged {
                batches_all,
                batch_size,
            } => write!(
                f,
                "results did not converge (tried {} batches of {})",
                batches_all, batch_size
            ),
            Self::Io(err) => write!(f, "failed to write output: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
