//! Small shared types.

use serde::{Deserialize, Serialize};

/// Whether per-sample durations are kept in the result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleRetention {
    /// Only aggregate statistics are reported.
    #[default]
    Discard,
    /// The reported population's samples are attached to the result,
    /// each with its outlier classification.
    Keep,
}

impl SampleRetention {
    /// Whether samples should be recorded.
    pub fn is_kept(self) -> bool {
        matches!(self, SampleRetention::Keep)
    }
}

/// One normalized sample of the reported population, preserving
/// measurement order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    /// Per-invocation duration in nanoseconds.
    pub duration_ns: f64,
    /// Whether the sample fell outside the outlier band.
    pub is_outlier: bool,
}

/// Time unit used when formatting durations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeUnit {
    /// Picoseconds.
    Picoseconds,
    /// Nanoseconds.
    #[default]
    Nanoseconds,
    /// Microseconds.
    Microseconds,
    /// Milliseconds.
    Milliseconds,
    /// Seconds.
    Seconds,
}

impl TimeUnit {
    /// Unit suffix, e.g. `"ns"`.
    pub fn suffix(self) -> &'static str {
        match self {
            TimeUnit::Picoseconds => "ps",
            TimeUnit::Nanoseconds => "ns",
            TimeUnit::Microseconds => "us",
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Seconds => "s",
        }
    }

    /// Convert a value in nanoseconds to this unit.
    pub fn from_ns(self, ns: f64) -> f64 {
        match self {
            TimeUnit::Picoseconds => ns * 1e3,
            TimeUnit::Nanoseconds => ns,
            TimeUnit::Microseconds => ns / 1e3,
            TimeUnit::Milliseconds => ns / 1e6,
            TimeUnit::Seconds => ns / 1e9,
        }
    }
}

impl std::fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.suffix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_conversion() {
        assert_eq!(TimeUnit::Microseconds.from_ns(1500.0), 1.5);
        assert_eq!(TimeUnit::Picoseconds.from_ns(2.0), 2000.0);
        assert_eq!(TimeUnit::Seconds.suffix(), "s");
    }
}
