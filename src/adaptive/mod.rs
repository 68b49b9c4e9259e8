//! Adaptive convergence search.
//!
//! - [`SizeAdapter`] - batch and population size feedback
//! - [`ConvergenceController`] - the iterate/filter/accept loop
//! - [`Calibrator`] - measures the clock overhead the search depends on

mod calibration;
mod loop_runner;
mod sizing;
mod state;

pub use calibration::{Calibration, Calibrator};
pub use loop_runner::{ConvergenceController, Mode, Outcome};
pub use sizing::{SizeAdapter, SizeDecision};
pub use state::{Candidate, Phase, SearchState};
