//! Observation hooks for external instrumentation.
//!
//! Every hook receives `(iteration, population_or_batch_index, batch_size)`.
//! Hooks run outside the timed region and never affect the result; all of
//! them default to no-ops.
//!
//! ```ignore
//! use timing_engine::{Benchmark, Hooks};
//!
//! let mut batches = 0usize;
//! let hooks = Hooks::new().on_batch_stop(|_, _, _| batches += 1);
//! let result = Benchmark::new().hooks(hooks).run(|| work());
//! ```

type Hook<'a> = Box<dyn FnMut(usize, usize, usize) + 'a>;

/// Set of optional observation callbacks.
pub struct Hooks<'a> {
    iteration_start: Hook<'a>,
    batch_start: Hook<'a>,
    batch_stop: Hook<'a>,
    iteration_stop: Hook<'a>,
    batch_select: Hook<'a>,
    iteration_select: Hook<'a>,
}

fn noop<'a>() -> Hook<'a> {
    Box::new(|_, _, _| {})
}

impl Default for Hooks<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Hooks<'a> {
    /// Create a hook set where every hook does nothing.
    pub fn new() -> Self {
        Self {
            iteration_start: noop(),
            batch_start: noop(),
            batch_stop: noop(),
            iteration_stop: noop(),
            batch_select: noop(),
            iteration_select: noop(),
        }
    }

    /// Called before each population with `(iteration, population, batch_size)`.
    pub fn on_iteration_start(mut self, f: impl FnMut(usize, usize, usize) + 'a) -> Self {
        self.iteration_start = Box::new(f);
        self
    }

    /// Called before each timed batch with `(iteration, batch, batch_size)`.
    pub fn on_batch_start(mut self, f: impl FnMut(usize, usize, usize) + 'a) -> Self {
        self.batch_start = Box::new(f);
        self
    }

    /// Called after each timed batch with `(iteration, batch, batch_size)`.
    pub fn on_batch_stop(mut self, f: impl FnMut(usize, usize, usize) + 'a) -> Self {
        self.batch_stop = Box::new(f);
        self
    }

    /// Called after each population with `(iteration, population, batch_size)`.
    pub fn on_iteration_stop(mut self, f: impl FnMut(usize, usize, usize) + 'a) -> Self {
        self.iteration_stop = Box::new(f);
        self
    }

    /// Called for every batch retained as a non-outlier with
    /// `(iteration, batch, batch_size)`.
    pub fn on_batch_select(mut self, f: impl FnMut(usize, usize, usize) + 'a) -> Self {
        self.batch_select = Box::new(f);
        self
    }

    /// Called when an iteration becomes the candidate result with
    /// `(iteration, population, batch_size)`, where `population` counts every
    /// batch of the population, outliers included.
    ///
    /// The last call corresponds to the reported result.
    pub fn on_iteration_select(mut self, f: impl FnMut(usize, usize, usize) + 'a) -> Self {
        self.iteration_select = Box::new(f);
        self
    }

    pub(crate) fn iteration_start(&mut self, iteration: usize, population: usize, batch_size: usize) {
        (self.iteration_start)(iteration, population, batch_size)
    }

    pub(crate) fn batch_start(&mut self, iteration: usize, batch: usize, batch_size: usize) {
        (self.batch_start)(iteration, batch, batch_size)
    }

    pub(crate) fn batch_stop(&mut self, iteration: usize, batch: usize, batch_size: usize) {
        (self.batch_stop)(iteration, batch, batch_size)
    }

    pub(crate) fn iteration_stop(&mut self, iteration: usize, population: usize, batch_size: usize) {
        (self.iteration_stop)(iteration, population, batch_size)
    }

    pub(crate) fn batch_select(&mut self, iteration: usize, batch: usize, batch_size: usize) {
        (self.batch_select)(iteration, batch, batch_size)
    }

    pub(crate) fn iteration_select(&mut self, iteration: usize, population: usize, batch_size: usize) {
        (self.iteration_select)(iteration, population, batch_size)
    }
}

impl std::fmt::Debug for Hooks<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_hooks_are_noops() {
        let mut hooks = Hooks::default();
        hooks.iteration_start(0, 30, 1);
        hooks.batch_start(0, 0, 1);
        hooks.batch_stop(0, 0, 1);
        hooks.iteration_stop(0, 30, 1);
        hooks.batch_select(0, 0, 1);
        hooks.iteration_select(0, 30, 1);
    }

    #[test]
    fn test_hook_receives_arguments() {
        let mut seen = Vec::new();
        {
            let mut hooks = Hooks::new().on_batch_stop(|i, b, s| seen.push((i, b, s)));
            hooks.batch_stop(2, 7, 100);
            hooks.batch_start(9, 9, 9);
        }
        assert_eq!(seen, vec![(2, 7, 100)]);
    }
}
