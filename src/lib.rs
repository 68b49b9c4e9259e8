//! # timing-engine
//!
//! Measure the mean cost of one invocation of a workload with a bounded
//! relative error.
//!
//! The workload is run in batches timed as a unit; batches form a
//! population, and populations are measured repeatedly while two feedback
//! controllers adapt the batch size (to keep the clock overhead negligible)
//! and the population size (to keep the error of the mean within target).
//! The result reports:
//! - Mean and standard deviation per invocation, after outlier rejection
//! - The same statistics over the whole population
//! - Whether the precision target was reached before the time budget ran out
//!
//! ## Common Pitfall: Dead Workloads
//!
//! The result of every invocation is passed through `black_box`, so a
//! closure that *returns* its result is never optimized away. A closure
//! that computes something and drops it may still be.
//!
//! ```ignore
//! // WRONG - the sum is discarded and may be removed entirely
//! run(|| { let _ = data.iter().sum::<u64>(); });
//!
//! // CORRECT - return the value
//! run(|| data.iter().sum::<u64>());
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use timing_engine::{run, Benchmark};
//!
//! // Simple API
//! let result = run(|| my_function(&input))?;
//! println!("{:.2} ns ± {:.2}", result.mean_ns, result.sigma_ns);
//!
//! // Builder API
//! let result = Benchmark::new()
//!     .stddev_perc(0.5)
//!     .retain_samples()
//!     .run(|| my_function(&input))?;
//! ```
//!
//! Diagnostics are emitted through `tracing`; install a subscriber to see
//! them.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
mod benchmark;
mod config;
pub mod constants;
mod error;
mod hooks;
mod result;
mod types;

// Functional modules
pub mod adaptive;
pub mod measurement;
pub mod output;
pub mod statistics;

// Re-exports for public API
pub use benchmark::{calibrate, run, run_with, Benchmark};
pub use config::Parameters;
pub use error::Error;
pub use hooks::Hooks;
pub use measurement::{Clock, ClockSpec, CycleCounterClock, SimulatedClock, WallClock};
pub use result::{Metadata, RunResult, Termination};
pub use types::{SampleRecord, SampleRetention, TimeUnit};
