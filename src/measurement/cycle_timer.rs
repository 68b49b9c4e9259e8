//! Clock selection.
//!
//! - `ClockSpec` - which clock the caller asked for
//! - `BoxedClock` - an enum wrapping the concrete clocks, created when a
//!   `Benchmark` runs

use super::clock::{Clock, WallClock};
use super::timer::CycleCounterClock;
use crate::error::Error;

/// A clock that can be any of the built-in implementations.
///
/// Enum dispatch keeps the timed loop free of virtual calls.
#[derive(Debug, Clone, Copy)]
pub enum BoxedClock {
    /// Monotonic wall clock.
    Wall(WallClock),
    /// Calibrated hardware cycle counter.
    CycleCounter(CycleCounterClock),
}

impl Clock for BoxedClock {
    #[inline]
    fn now(&self) -> u64 {
        match self {
            BoxedClock::Wall(c) => c.now(),
            BoxedClock::CycleCounter(c) => c.now(),
        }
    }

    fn ticks_per_ns(&self) -> f64 {
        match self {
            BoxedClock::Wall(c) => c.ticks_per_ns(),
            BoxedClock::CycleCounter(c) => c.ticks_per_ns(),
        }
    }

    fn check(&self) -> Result<(), Error> {
        match self {
            BoxedClock::Wall(c) => c.check(),
            BoxedClock::CycleCounter(c) => c.check(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            BoxedClock::Wall(c) => c.name(),
            BoxedClock::CycleCounter(c) => c.name(),
        }
    }
}

/// Specification for which clock to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClockSpec {
    /// Monotonic wall clock (`std::time::Instant`).
    ///
    /// Portable and needs no calibration beyond the overhead measurement.
    #[default]
    Wall,

    /// Hardware cycle counter (rdtsc on x86_64, cntvct_el0 on aarch64).
    ///
    /// Finer resolution, but selection fails on machines where the counter
    /// does not run at a constant rate. There is no silent fallback.
    CycleCounter,
}

impl ClockSpec {
    /// Create a clock based on this specification.
    ///
    /// # Errors
    ///
    /// `CycleCounter` fails with [`Error::NonInvariantCounter`] or
    /// [`Error::ClockUnsupported`] when the platform cannot guarantee a
    /// constant-rate counter.
    pub fn create_clock(&self) -> Result<BoxedClock, Error> {
        match self {
            ClockSpec::Wall => Ok(BoxedClock::Wall(WallClock::new())),
            ClockSpec::CycleCounter => Ok(BoxedClock::CycleCounter(CycleCounterClock::new()?)),
        }
    }
}

impl std::fmt::Display for ClockSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClockSpec::Wall => write!(f, "Wall"),
            ClockSpec::CycleCounter => write!(f, "CycleCounter"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wall_spec_always_available() {
        let clock = ClockSpec::Wall.create_clock().expect("wall clock");
        assert_eq!(clock.name(), "steady");
        assert_eq!(clock.ticks_per_ns(), 1.0);
    }

    #[test]
    fn test_cycle_spec_fails_fast_or_calibrates() {
        match ClockSpec::CycleCounter.create_clock() {
            Ok(clock) => assert!(clock.ticks_per_ns() > 0.0),
            Err(Error::NonInvariantCounter) | Err(Error::ClockUnsupported { .. }) => {}
            Err(other) => panic!("unexpected error: {}", other),
        }
    }
}
