//! Per-actor random choice
//!
//! Each actor owns a `SimRng`; nothing random is shared between threads.
//! Seeded actors are reproducible, so a run with a fixed base seed draws the
//! same arrival, break and transaction durations every time (thread
//! interleaving aside).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Bounded uniform chooser owned by a single actor
#[derive(Debug, Clone)]
pub struct SimRng {
    rng: StdRng,
}

impl SimRng {
    pub fn seeded(seed: u64) -> Self {
        SimRng {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        SimRng {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Seed for actor `actor_index` derived from `base_seed`, or entropy when
    /// no base seed was given
    pub fn for_actor(base_seed: Option<u64>, actor_index: u64) -> Self {
        match base_seed {
            Some(seed) => Self::seeded(seed.wrapping_add(actor_index)),
            None => Self::from_entropy(),
        }
    }

    /// Uniform value in the inclusive range `[lo, hi]`
    ///
    /// Bounds given in the wrong order are swapped, and `choose(x, x)` is
    /// always `x`, which is how fixed durations are configured.
    ///
    /// ```
    /// use sim_core::SimRng;
    ///
    /// let mut rng = SimRng::seeded(7);
    /// assert_eq!(rng.choose(600, 600), 600);
    /// let v = rng.choose(60, 240);
    /// assert!((60..=240).contains(&v));
    /// ```
    pub fn choose(&mut self, lo: u64, hi: u64) -> u64 {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        if lo == hi {
            return lo;
        }
        self.rng.random_range(lo..=hi)
    }
}
