//! Per-population statistics.

use serde::{Deserialize, Serialize};

use super::OnlineStats;

/// Statistics of one population of normalized samples, in clock ticks per
/// invocation.
///
/// The `_all` fields include outliers; the unsuffixed fields cover only the
/// retained samples. `count <= count_all` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Retained samples.
    pub count: usize,
    /// All samples.
    pub count_all: usize,
    /// Mean of retained samples.
    pub mean: f64,
    /// Mean of all samples.
    pub mean_all: f64,
    /// Standard deviation of retained samples.
    pub sigma: f64,
    /// Standard deviation of all samples.
    pub sigma_all: f64,
    /// Smallest retained sample.
    pub min: f64,
    /// Largest retained sample.
    pub max: f64,
    /// Smallest sample.
    pub min_all: f64,
    /// Largest sample.
    pub max_all: f64,
}

impl RunStatistics {
    /// Combine the full-population and retained accumulators.
    pub fn from_parts(all: &OnlineStats, retained: &OnlineStats) -> Self {
        Self {
            count: retained.count(),
            count_all: all.count(),
            mean: retained.mean(),
            mean_all: all.mean(),
            sigma: retained.sigma(),
            sigma_all: all.sigma(),
            min: retained.min(),
            max: retained.max(),
            min_all: all.min(),
            max_all: all.max(),
        }
    }

    /// Samples rejected as outliers.
    pub fn outliers(&self) -> usize {
        self.count_all - self.count
    }

    /// Whether the retained population reaches `min_size`.
    pub fn is_significant(&self, min_size: usize) -> bool {
        self.count >= min_size
    }
}
