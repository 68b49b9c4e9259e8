//! Sigma-band outlier filtering.
//!
//! A sample `x` is an outlier iff `|x - mean_all| > k * sigma_all`, where
//! `mean_all` and `sigma_all` are computed over the whole population and
//! `k` is `confidence_outlier_sigma`. Statistics are then recomputed over
//! the retained samples.
//!
//! Identical samples have zero sigma and are never outliers, because the
//! comparison is strict.

use crate::statistics::{OnlineStats, RunStatistics};

/// Classifies samples against a sigma band around the population mean.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierFilter {
    confidence_outlier_sigma: f64,
}

impl OutlierFilter {
    /// Create a filter with band half-width `confidence_outlier_sigma * sigma_all`.
    pub fn new(confidence_outlier_sigma: f64) -> Self {
        Self {
            confidence_outlier_sigma,
        }
    }

    /// Half-width of the band for a given population sigma.
    #[inline]
    pub fn band(&self, sigma_all: f64) -> f64 {
        self.confidence_outlier_sigma * sigma_all
    }

    /// Whether `x` lies outside the band.
    #[inline]
    pub fn is_outlier(&self, x: f64, mean_all: f64, sigma_all: f64) -> bool {
        (x - mean_all).abs() > self.band(sigma_all)
    }

    /// Compute full-population statistics, then statistics over the samples
    /// inside the band.
    ///
    /// `on_retained` is called with the index of every retained sample, in
    /// order.
    pub fn apply(&self, samples: &[f64], mut on_retained: impl FnMut(usize)) -> RunStatistics {
        let all: OnlineStats = samples.iter().copied().collect();
        let (mean_all, sigma_all) = (all.mean(), all.sigma());

        let mut retained = OnlineStats::new();
        for (i, &x) in samples.iter().enumerate() {
            let outlier = self.is_outlier(x, mean_all, sigma_all);
            tracing::trace!(value = x, outlier, "sample");
            if outlier {
                continue;
            }
            on_retained(i);
            retained.push(x);
        }

        RunStatistics::from_parts(&all, &retained)
    }

    /// Outlier flag for every sample, given the population statistics.
    pub fn classify(&self, samples: &[f64], stats: &RunStatistics) -> Vec<bool> {
        samples
            .iter()
            .map(|&x| self.is_outlier(x, stats.mean_all, stats.sigma_all))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_single_spike_rejected() {
        let mut samples = vec![100.0; 30];
        samples.push(10_000.0);
        let stats = OutlierFilter::new(4.0).apply(&samples, |_| {});

        assert_eq!(stats.count_all, 31);
        assert_eq!(stats.count, 30);
        assert_eq!(stats.mean, 100.0);
        assert_eq!(stats.sigma, 0.0);
        assert_eq!(stats.max_all, 10_000.0);
        assert_eq!(stats.max, 100.0);
        assert!(stats.mean_all > 100.0);
    }

    #[test]
    fn test_identical_samples_never_outliers() {
        let samples = vec![5.0; 40];
        let stats = OutlierFilter::new(0.5).apply(&samples, |_| {});
        assert_eq!(stats.count, 40);
        assert_eq!(stats.outliers(), 0);
    }

    #[test]
    fn test_retained_callback_indices() {
        let samples = vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 50.0];
        let mut retained = Vec::new();
        OutlierFilter::new(2.0).apply(&samples, |i| retained.push(i));
        assert_eq!(retained, (0..9).collect::<Vec<_>>());
    }

    #[test]
    fn test_classify_matches_apply() {
        let samples = vec![10.0, 11.0, 9.0, 10.0, 10.5, 9.5, 10.0, 80.0];
        let filter = OutlierFilter::new(2.0);
        let stats = filter.apply(&samples, |_| {});
        let flags = filter.classify(&samples, &stats);
        assert_eq!(flags.iter().filter(|&&f| f).count(), stats.outliers());
        assert!(flags[7]);
    }

    proptest! {
        #[test]
        fn wider_band_never_adds_outliers(
            samples in prop::collection::vec(0.0f64..1000.0, 2..100),
            k in 0.1f64..5.0,
            extra in 0.0f64..5.0,
        ) {
            let narrow = OutlierFilter::new(k).apply(&samples, |_| {});
            let wide = OutlierFilter::new(k + extra).apply(&samples, |_| {});
            prop_assert!(wide.outliers() <= narrow.outliers());
            prop_assert!(narrow.count <= narrow.count_all);
        }
    }
}
