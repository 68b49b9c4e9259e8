//! The clock capability used by the benchmark loop.
//!
//! A [`Clock`] hands out opaque ticks and knows how many ticks make a
//! nanosecond. The convergence loop is written once against this trait:
//!
//! - [`WallClock`] - monotonic `std::time::Instant`, 1 tick = 1 ns
//! - [`CycleCounterClock`](super::CycleCounterClock) - hardware counter,
//!   calibrated against the wall clock on construction
//! - [`SimulatedClock`] - deterministic clock for testing harnesses

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use crate::error::Error;

/// A monotonic time source.
pub trait Clock {
    /// Current time in clock ticks.
    fn now(&self) -> u64;

    /// Ticks per nanosecond.
    fn ticks_per_ns(&self) -> f64 {
        1.0
    }

    /// Verify the clock is usable on this machine.
    fn check(&self) -> Result<(), Error> {
        Ok(())
    }

    /// Clock name for diagnostics and metadata.
    fn name(&self) -> &'static str;

    /// Convert a tick count to nanoseconds.
    #[inline]
    fn ticks_to_ns(&self, ticks: f64) -> f64 {
        ticks / self.ticks_per_ns()
    }

    /// Convert nanoseconds to ticks.
    #[inline]
    fn ns_to_ticks(&self, ns: f64) -> f64 {
        ns * self.ticks_per_ns()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    #[inline]
    fn now(&self) -> u64 {
        (**self).now()
    }

    fn ticks_per_ns(&self) -> f64 {
        (**self).ticks_per_ns()
    }

    fn check(&self) -> Result<(), Error> {
        (**self).check()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Monotonic wall clock with nanosecond ticks.
#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    origin: Instant,
}

impl WallClock {
    /// Create a wall clock whose tick zero is now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for WallClock {
    #[inline]
    fn now(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }

    fn name(&self) -> &'static str {
        "steady"
    }
}

/// Deterministic clock for exercising the benchmark loop.
///
/// Every read returns the current tick and then advances the clock by the
/// configured read cost, so the overhead of reading the clock is known
/// exactly. Workloads advance the clock with [`advance`](Self::advance).
/// Clones share the same counter.
///
/// ```ignore
/// let clock = SimulatedClock::new(0);
/// let workload_clock = clock.clone();
/// let result = Benchmark::new()
///     .clock_time_ns(1.0)
///     .run_with_clock(&clock, move || workload_clock.advance(100));
/// ```
#[derive(Debug, Clone)]
pub struct SimulatedClock {
    ticks: Rc<Cell<u64>>,
    read_cost: u64,
    ticks_per_ns: f64,
}

impl SimulatedClock {
    /// Create a simulated clock with nanosecond ticks where each read
    /// costs `read_cost` ticks.
    pub fn new(read_cost: u64) -> Self {
        Self::with_ticks_per_ns(read_cost, 1.0)
    }

    /// Create a simulated clock with a custom tick rate.
    pub fn with_ticks_per_ns(read_cost: u64, ticks_per_ns: f64) -> Self {
        Self {
            ticks: Rc::new(Cell::new(0)),
            read_cost,
            ticks_per_ns,
        }
    }

    /// Advance the clock by `ticks`.
    #[inline]
    pub fn advance(&self, ticks: u64) {
        self.ticks.set(self.ticks.get() + ticks);
    }

    /// Current tick without paying the read cost.
    pub fn peek(&self) -> u64 {
        self.ticks.get()
    }
}

impl Clock for SimulatedClock {
    #[inline]
    fn now(&self) -> u64 {
        let t = self.ticks.get();
        self.ticks.set(t + self.read_cost);
        t
    }

    fn ticks_per_ns(&self) -> f64 {
        self.ticks_per_ns
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wall_clock_monotonic() {
        let clock = WallClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
        assert_eq!(clock.ticks_per_ns(), 1.0);
        assert!(clock.check().is_ok());
    }

    #[test]
    fn test_simulated_read_cost() {
        let clock = SimulatedClock::new(5);
        assert_eq!(clock.now(), 0);
        assert_eq!(clock.now(), 5);
        clock.advance(100);
        assert_eq!(clock.peek(), 110);
    }

    #[test]
    fn test_simulated_clones_share_counter() {
        let clock = SimulatedClock::new(0);
        let other = clock.clone();
        other.advance(42);
        assert_eq!(clock.now(), 42);
    }

    #[test]
    fn test_tick_conversion() {
        let clock = SimulatedClock::with_ticks_per_ns(0, 3.0);
        assert_eq!(clock.ticks_to_ns(300.0), 100.0);
        assert_eq!(clock.ns_to_ticks(100.0), 300.0);
    }
}
