//! Simulated time
//!
//! Every actor in a simulation keeps its own cursor of simulated seconds.
//! There is no shared clock: cursors advance locally, either by sleeping for a
//! simulated duration or by folding in real time spent blocked on a lock.
//!
//! `SimClock` only holds the scale between the two time bases, so it is `Copy`
//! and each thread can carry its own.

use std::thread;
use std::time::{Duration, Instant};

/// Real time per simulated second used when nothing else is configured.
///
/// One simulated minute takes roughly a tenth of a real second.
pub const DEFAULT_MICROS_PER_SIM_SEC: u64 = 1667;

/// Scale between simulated seconds and wall-clock time
///
/// # Example
///
/// ```
/// use sim_core::SimClock;
/// use std::time::Duration;
///
/// let clock = SimClock::from_micros(1000);
/// assert_eq!(clock.to_real(60), Duration::from_millis(60));
/// assert_eq!(clock.to_sim(Duration::from_millis(60)), 60);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimClock {
    real_per_sim: Duration,
}

impl Default for SimClock {
    fn default() -> Self {
        Self::from_micros(DEFAULT_MICROS_PER_SIM_SEC)
    }
}

impl SimClock {
    /// Create a clock where one simulated second lasts `real_per_sim`
    ///
    /// A zero scale is bumped to one nanosecond so conversions back to
    /// simulated time never divide by zero.
    pub fn new(real_per_sim: Duration) -> Self {
        let real_per_sim = real_per_sim.max(Duration::from_nanos(1));
        SimClock { real_per_sim }
    }

    pub fn from_micros(micros_per_sim_sec: u64) -> Self {
        Self::new(Duration::from_micros(micros_per_sim_sec))
    }

    pub fn real_per_sim(&self) -> Duration {
        self.real_per_sim
    }

    /// Convert a simulated duration to the real time it takes
    pub fn to_real(&self, sim_secs: u64) -> Duration {
        let nanos = self.real_per_sim.as_nanos().saturating_mul(sim_secs as u128);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Convert real time to whole simulated seconds, truncating
    pub fn to_sim(&self, real: Duration) -> u64 {
        let sim = real.as_nanos() / self.real_per_sim.as_nanos();
        u64::try_from(sim).unwrap_or(u64::MAX)
    }

    /// Block the calling thread for `duration_sim_secs` and return the
    /// advanced cursor
    ///
    /// This is the only place simulated activity (arrivals, breaks,
    /// transactions) turns into real waiting.
    pub fn sleep_and_advance(&self, duration_sim_secs: u64, local_clock: u64) -> u64 {
        thread::sleep(self.to_real(duration_sim_secs));
        local_clock + duration_sim_secs
    }

    /// Simulated seconds elapsed since `start`
    ///
    /// Used to charge time spent blocked on a shared lock to the caller's
    /// cursor.
    pub fn elapsed_since(&self, start: Instant) -> u64 {
        self.to_sim(start.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scale() {
        let clock = SimClock::default();
        assert_eq!(clock.real_per_sim(), Duration::from_micros(1667));
        // one simulated minute is about 100ms
        assert_eq!(clock.to_real(60), Duration::from_micros(100_020));
    }

    #[test]
    fn test_to_sim_truncates() {
        let clock = SimClock::from_micros(1000);
        assert_eq!(clock.to_sim(Duration::from_micros(999)), 0);
        assert_eq!(clock.to_sim(Duration::from_micros(1999)), 1);
        assert_eq!(clock.to_sim(Duration::from_millis(300)), 300);
    }

    #[test]
    fn test_zero_scale_is_clamped() {
        let clock = SimClock::new(Duration::ZERO);
        assert_eq!(clock.real_per_sim(), Duration::from_nanos(1));
        assert_eq!(clock.to_sim(Duration::from_nanos(5)), 5);
    }

    #[test]
    fn test_sleep_and_advance() {
        let clock = SimClock::from_micros(100);
        let start = Instant::now();
        let advanced = clock.sleep_and_advance(50, 1000);
        assert_eq!(advanced, 1050);
        assert!(start.elapsed() >= Duration::from_micros(5000));
    }

    #[test]
    fn test_elapsed_since_counts_real_time() {
        let clock = SimClock::from_micros(100);
        let start = Instant::now();
        thread::sleep(Duration::from_millis(2));
        assert!(clock.elapsed_since(start) >= 20);
    }

    #[test]
    fn test_to_real_saturates() {
        let clock = SimClock::new(Duration::from_secs(u64::MAX / 2));
        assert_eq!(clock.to_real(u64::MAX), Duration::from_nanos(u64::MAX));
    }
}
