//! Statistics over timing samples.
//!
//! - [`OnlineStats`] - one-pass Welford accumulator
//! - [`RunStatistics`] - full-population and outlier-filtered summary of
//!   one population

mod online;
mod run_stats;

pub use online::OnlineStats;
pub use run_stats::RunStatistics;
