//! Measurement infrastructure.
//!
//! This module provides:
//! - The [`Clock`] capability and its implementations
//! - Timed batch execution with optimizer barriers
//! - Sigma-band outlier filtering
//!
//! # Clock Selection
//!
//! By default, timing uses the monotonic wall clock. The hardware cycle
//! counter can be selected explicitly:
//! - **x86_64**: `rdtsc`, only when the CPU advertises an invariant TSC
//! - **aarch64**: `cntvct_el0` virtual timer
//!
//! Either way, the clock's own read overhead is calibrated before the
//! first real run.

mod clock;
mod collector;
mod cycle_timer;
mod outlier;
mod timer;

pub use clock::{Clock, SimulatedClock, WallClock};
pub use collector::BatchRunner;
pub use cycle_timer::{BoxedClock, ClockSpec};
pub use outlier::OutlierFilter;
pub use timer::{check_invariant, estimate_frequency, read_counter, CycleCounterClock, FrequencyEstimate};
