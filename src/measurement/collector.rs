//! Timed batch execution.
//!
//! A batch runs the workload `batch_size` times back-to-back inside one
//! clock bracket. Every invocation is passed through `black_box` and
//! followed by a compiler fence, so the optimizer can neither elide calls
//! nor move them across the bracket, even for workloads with no
//! observable side effects.

use std::hint::black_box;
use std::sync::atomic::{compiler_fence, Ordering};

use super::clock::Clock;

/// Runs batches of a workload against a clock.
#[derive(Debug)]
pub struct BatchRunner<'c, C: Clock> {
    clock: &'c C,
}

impl<'c, C: Clock> BatchRunner<'c, C> {
    /// Create a runner reading the given clock.
    pub fn new(clock: &'c C) -> Self {
        Self { clock }
    }

    /// The clock used for timing.
    pub fn clock(&self) -> &'c C {
        self.clock
    }

    /// Run `warmup` untimed invocations, then time `batch_size` invocations.
    ///
    /// Returns the raw duration of the whole batch in clock ticks.
    #[inline]
    pub fn run_batch<F, T>(&self, warmup: usize, batch_size: usize, func: &mut F) -> u64
    where
        F: FnMut() -> T,
    {
        repeat_untimed(warmup, func);
        time_repeated(self.clock, batch_size, func)
    }

    /// Run `batches` untimed batches of `warmup + batch_size` invocations.
    pub fn warmup_group<F, T>(&self, batches: usize, warmup: usize, batch_size: usize, func: &mut F)
    where
        F: FnMut() -> T,
    {
        for _ in 0..batches {
            repeat_untimed(warmup + batch_size, func);
        }
    }
}

// Kept out of line so the warmup and timed loops are optimized separately.
#[inline(never)]
fn repeat_untimed<F, T>(count: usize, func: &mut F)
where
    F: FnMut() -> T,
{
    for _ in 0..count {
        black_box(func());
        compiler_fence(Ordering::SeqCst);
    }
}

#[inline(never)]
fn time_repeated<C, F, T>(clock: &C, count: usize, func: &mut F) -> u64
where
    C: Clock,
    F: FnMut() -> T,
{
    let start = clock.now();
    compiler_fence(Ordering::SeqCst);
    for _ in 0..count {
        black_box(func());
        compiler_fence(Ordering::SeqCst);
    }
    let end = clock.now();
    end.saturating_sub(start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::SimulatedClock;

    #[test]
    fn test_invocation_counts() {
        let clock = SimulatedClock::new(0);
        let runner = BatchRunner::new(&clock);
        let mut calls = 0usize;
        let mut func = || calls += 1;
        runner.run_batch(3, 10, &mut func);
        assert_eq!(calls, 13);
    }

    #[test]
    fn test_only_batch_is_timed() {
        let clock = SimulatedClock::new(0);
        let work = clock.clone();
        let runner = BatchRunner::new(&clock);
        let mut func = || work.advance(7);
        let ticks = runner.run_batch(5, 4, &mut func);
        assert_eq!(ticks, 28);
    }

    #[test]
    fn test_bracket_includes_one_read() {
        let clock = SimulatedClock::new(3);
        let work = clock.clone();
        let runner = BatchRunner::new(&clock);
        let mut func = || work.advance(10);
        // start read advances by 3 before the batch begins
        assert_eq!(runner.run_batch(0, 2, &mut func), 23);
    }

    #[test]
    fn test_warmup_group_not_timed() {
        let clock = SimulatedClock::new(1);
        let runner = BatchRunner::new(&clock);
        let mut calls = 0usize;
        let mut func = || calls += 1;
        runner.warmup_group(2, 1, 5, &mut func);
        assert_eq!(calls, 12);
        assert_eq!(clock.peek(), 0);
    }

    #[test]
    fn test_side_effect_free_workload_runs() {
        let clock = crate::measurement::WallClock::new();
        let runner = BatchRunner::new(&clock);
        let mut func = || {
            let mut sum = 0u64;
            for i in 0..100 {
                sum = sum.wrapping_add(i);
            }
            sum
        };
        let ticks = runner.run_batch(0, 1000, &mut func);
        assert!(ticks > 0);
    }
}
