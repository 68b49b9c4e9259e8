//! State carried across iterations of the convergence search.

use crate::statistics::RunStatistics;

/// Where the search currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No population measured yet.
    Bootstrapping,
    /// At least one population measured; adapting sizes.
    Sampling,
    /// A population met the precision target.
    Converged,
    /// The next population would not fit in the remaining budget.
    TimedOut,
    /// A population retained no samples after outlier rejection.
    Rejected,
}

impl Phase {
    /// Whether the search has stopped.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Converged | Phase::TimedOut | Phase::Rejected)
    }
}

/// One measured population, ready to be reported.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Statistics in ticks per invocation.
    pub stats: RunStatistics,
    /// Batch size the population was measured with.
    pub batch_size: usize,
    /// 0-based iteration index.
    pub iteration: usize,
    /// Normalized samples with outlier flags, when retained.
    pub samples: Option<Vec<(f64, bool)>>,
}

/// Best-so-far and latest populations.
///
/// Only statistically significant populations compete for "best"; ties
/// keep the earlier one.
#[derive(Debug, Default)]
pub struct SearchState {
    best: Option<Candidate>,
    latest: Option<Candidate>,
}

impl SearchState {
    /// Empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a population that did not qualify for best.
    pub fn record(&mut self, candidate: Candidate) {
        self.latest = Some(candidate);
    }

    /// Offer a significant population. Returns `true` if it replaced the
    /// best so far.
    pub fn offer(&mut self, candidate: Candidate) -> bool {
        let improves = match &self.best {
            None => true,
            Some(best) => candidate.stats.sigma < best.stats.sigma,
        };
        if improves {
            self.best = Some(candidate.clone());
        }
        self.latest = Some(candidate);
        improves
    }

    /// Best significant population so far.
    pub fn best(&self) -> Option<&Candidate> {
        self.best.as_ref()
    }

    /// Most recently measured population.
    pub fn latest(&self) -> Option<&Candidate> {
        self.latest.as_ref()
    }

    /// Best population if any qualified, otherwise the latest.
    pub fn into_result(self) -> Option<Candidate> {
        self.best.or(self.latest)
    }
}
