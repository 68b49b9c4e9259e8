//! Hardware cycle counter clock.
//!
//! Reads the counter with appropriate serialization:
//! - x86_64: `lfence; rdtsc` with compiler fences, requires an invariant TSC
//! - aarch64: `isb; mrs cntvct_el0` (the generic timer runs at a fixed rate)
//! - other targets: unsupported

use std::sync::atomic::{compiler_fence, Ordering};
use std::time::{Duration, Instant};

use super::clock::Clock;
use crate::error::Error;

/// Number of sleeps used to estimate the counter frequency.
const FREQUENCY_SAMPLES: usize = 50;

/// Length of each frequency estimation sleep.
const FREQUENCY_SLEEP: Duration = Duration::from_millis(2);

/// Interquartile spread of the frequency estimates above which the counter
/// is reported as unstable.
const MAX_FREQUENCY_SPREAD: f64 = 0.05;

/// Read the hardware counter.
#[inline]
pub fn read_counter() -> u64 {
    #[cfg(target_arch = "x86_64")]
    {
        read_x86_64()
    }

    #[cfg(target_arch = "aarch64")]
    {
        read_aarch64()
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        read_fallback()
    }
}

#[cfg(target_arch = "x86_64")]
#[inline]
fn read_x86_64() -> u64 {
    compiler_fence(Ordering::SeqCst);

    let cycles: u64;
    unsafe {
        // lfence keeps earlier instructions from drifting past the read
        std::arch::asm!(
            "lfence",
            "rdtsc",
            "shl rdx, 32",
            "or rax, rdx",
            out("rax") cycles,
            out("rdx") _,
            options(nostack, nomem),
        );
    }

    compiler_fence(Ordering::SeqCst);
    cycles
}

#[cfg(target_arch = "aarch64")]
#[inline]
fn read_aarch64() -> u64 {
    compiler_fence(Ordering::SeqCst);

    let ticks: u64;
    unsafe {
        std::arch::asm!(
            "isb",
            "mrs {}, cntvct_el0",
            out(reg) ticks,
            options(nostack, nomem),
        );
    }

    compiler_fence(Ordering::SeqCst);
    ticks
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
#[inline]
fn read_fallback() -> u64 {
    use std::sync::OnceLock;
    static START: OnceLock<Instant> = OnceLock::new();

    compiler_fence(Ordering::SeqCst);
    let ns = START.get_or_init(Instant::now).elapsed().as_nanos() as u64;
    compiler_fence(Ordering::SeqCst);
    ns
}

/// Check that the counter ticks at a constant rate on this machine.
///
/// # Errors
///
/// - [`Error::NonInvariantCounter`] if the x86_64 CPU lacks an invariant TSC
/// - [`Error::ClockUnsupported`] on targets without a usable counter
pub fn check_invariant() -> Result<(), Error> {
    #[cfg(target_arch = "x86_64")]
    {
        #[allow(unused_unsafe)]
        let (max_leaf, edx) = unsafe {
            use std::arch::x86_64::__cpuid;
            let max_leaf = __cpuid(0x8000_0000).eax;
            let edx = if max_leaf >= 0x8000_0007 {
                __cpuid(0x8000_0007).edx
            } else {
                0
            };
            (max_leaf, edx)
        };
        if max_leaf < 0x8000_0007 || edx & (1 << 8) == 0 {
            return Err(Error::NonInvariantCounter);
        }
        Ok(())
    }

    #[cfg(target_arch = "aarch64")]
    {
        Ok(())
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        Err(Error::ClockUnsupported {
            clock: "cycles",
            reason: "no hardware counter support for this architecture".to_string(),
        })
    }
}

/// Frequency estimate for the hardware counter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyEstimate {
    /// Median counter ticks per nanosecond.
    pub ticks_per_ns: f64,
    /// Interquartile range of the estimates relative to the median.
    pub spread: f64,
}

/// Estimate the counter frequency by comparing counter deltas against
/// wall-clock sleeps.
pub fn estimate_frequency() -> FrequencyEstimate {
    let mut ratios = Vec::with_capacity(FREQUENCY_SAMPLES);

    for _ in 0..FREQUENCY_SAMPLES {
        let start_ticks = read_counter();
        let start_time = Instant::now();

        std::thread::sleep(FREQUENCY_SLEEP);

        let end_ticks = read_counter();
        let elapsed_ns = start_time.elapsed().as_nanos() as u64;

        if elapsed_ns == 0 {
            continue;
        }

        let ticks = end_ticks.saturating_sub(start_ticks);
        ratios.push(ticks as f64 / elapsed_ns as f64);
    }

    summarize_ratios(&mut ratios)
}

fn summarize_ratios(ratios: &mut [f64]) -> FrequencyEstimate {
    if ratios.is_empty() {
        return FrequencyEstimate {
            ticks_per_ns: 0.0,
            spread: f64::INFINITY,
        };
    }

    ratios.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = ratios.len();
    let mid = n / 2;
    let median = if n % 2 == 0 {
        (ratios[mid - 1] + ratios[mid]) / 2.0
    } else {
        ratios[mid]
    };
    let q1 = ratios[n / 4];
    let q3 = ratios[(3 * n) / 4];
    let spread = if median > 0.0 {
        (q3 - q1) / median
    } else {
        f64::INFINITY
    };

    FrequencyEstimate {
        ticks_per_ns: median,
        spread,
    }
}

/// Clock backed by the hardware cycle counter.
///
/// Construction validates that the counter runs at a constant rate and
/// measures its frequency, so tick counts convert to nanoseconds.
#[derive(Debug, Clone, Copy)]
pub struct CycleCounterClock {
    ticks_per_ns: f64,
}

impl CycleCounterClock {
    /// Validate the counter and calibrate its frequency.
    ///
    /// Takes roughly `50 * 2ms` of sleeping.
    ///
    /// # Errors
    ///
    /// Fails if the counter is not invariant, unsupported on this target,
    /// or the frequency estimate is unusable.
    pub fn new() -> Result<Self, Error> {
        check_invariant()?;

        let estimate = estimate_frequency();
        if !estimate.ticks_per_ns.is_finite() || estimate.ticks_per_ns <= 0.0 {
            return Err(Error::ClockUnsupported {
                clock: "cycles",
                reason: format!(
                    "counter frequency estimate is unusable ({} ticks/ns)",
                    estimate.ticks_per_ns
                ),
            });
        }
        if estimate.spread > MAX_FREQUENCY_SPREAD {
            tracing::warn!(
                ticks_per_ns = estimate.ticks_per_ns,
                spread = estimate.spread,
                "cycle counter frequency estimate is unstable"
            );
        }
        tracing::debug!(ticks_per_ns = estimate.ticks_per_ns, "calibrated cycle counter");

        Ok(Self {
            ticks_per_ns: estimate.ticks_per_ns,
        })
    }

    /// Create a counter clock with a known frequency.
    ///
    /// Useful when calibration has already been done.
    pub fn with_ticks_per_ns(ticks_per_ns: f64) -> Self {
        Self { ticks_per_ns }
    }
}

impl Clock for CycleCounterClock {
    #[inline]
    fn now(&self) -> u64 {
        read_counter()
    }

    fn ticks_per_ns(&self) -> f64 {
        self.ticks_per_ns
    }

    fn check(&self) -> Result<(), Error> {
        check_invariant()
    }

    fn name(&self) -> &'static str {
        #[cfg(target_arch = "x86_64")]
        {
            "rdtsc"
        }
        #[cfg(target_arch = "aarch64")]
        {
            "cntvct_el0"
        }
        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
        {
            "cycles"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_monotonic() {
        let a = read_counter();
        let b = read_counter();
        assert!(b >= a || a.saturating_sub(b) < 1000);
    }

    #[test]
    fn test_summarize_ratios() {
        let mut ratios = vec![3.0, 3.0, 3.1, 2.9, 3.0];
        let estimate = summarize_ratios(&mut ratios);
        assert_eq!(estimate.ticks_per_ns, 3.0);
        assert!(estimate.spread < 0.1, "spread = {}", estimate.spread);
    }

    #[test]
    fn test_summarize_empty() {
        let estimate = summarize_ratios(&mut []);
        assert_eq!(estimate.ticks_per_ns, 0.0);
        assert!(estimate.spread.is_infinite());
    }

    #[test]
    fn test_known_frequency_conversion() {
        let clock = CycleCounterClock::with_ticks_per_ns(2.5);
        assert_eq!(clock.ticks_to_ns(250.0), 100.0);
    }

    #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
    #[test]
    fn test_calibrated_frequency_reasonable() {
        // Skip machines without an invariant counter (e.g. some VMs)
        let Ok(clock) = CycleCounterClock::new() else {
            return;
        };
        // ARM generic timers run at tens of MHz, x86 TSCs at a few GHz
        let tpn = clock.ticks_per_ns();
        assert!(tpn > 0.001 && tpn < 10.0, "ticks_per_ns = {}", tpn);
    }
}
