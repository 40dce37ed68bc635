//! Simulation parameters
//!
//! Defaults describe a bank open 9:00 AM to 4:00 PM with three tellers.
//! A TOML file can override any subset of fields; missing fields keep their
//! defaults:
//!
//! ```toml
//! num_tellers = 4
//! seed = 42
//!
//! [transaction_duration]
//! min = 60
//! max = 300
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sim_core::{DEFAULT_MICROS_PER_SIM_SEC, SimClock};
use thiserror::Error;

use crate::time_of_day::clock_time;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{name} bounds are invalid: min {min} > max {max}")]
    InvalidBounds { name: &'static str, min: u64, max: u64 },

    #[error("{name} must be at least one second")]
    ZeroDuration { name: &'static str },

    #[error("at least one teller is required")]
    NoTellers,

    #[error("closing time {close} is not after opening time {open}")]
    EmptyDay { open: u64, close: u64 },

    #[error("queue capacity {capacity} is below the worst case of {worst_case} arrivals")]
    CapacityTooSmall { capacity: usize, worst_case: usize },
}

/// Inclusive range of simulated seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: u64,
    pub max: u64,
}

impl Bounds {
    pub const fn new(min: u64, max: u64) -> Self {
        Bounds { min, max }
    }

    /// A duration that never varies
    pub const fn fixed(secs: u64) -> Self {
        Bounds {
            min: secs,
            max: secs,
        }
    }

    fn check(&self, name: &'static str) -> Result<(), ConfigError> {
        if self.min > self.max {
            return Err(ConfigError::InvalidBounds {
                name,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BankConfig {
    /// Opening time, seconds after midnight
    pub open_sec: u64,
    /// Closing time; no arrivals are generated once the clock reaches it
    pub close_sec: u64,
    pub arrival_interval: Bounds,
    /// Time between the end of one teller break and the next
    pub break_frequency: Bounds,
    pub break_length: Bounds,
    pub transaction_duration: Bounds,
    pub num_tellers: usize,
    /// Longest a teller waits on the queue before re-checking its schedule
    pub wait_cap_sec: u64,
    /// Most customers the queue accepts in one day
    pub queue_capacity: usize,
    pub micros_per_sim_sec: u64,
    pub seed: Option<u64>,
}

impl Default for BankConfig {
    fn default() -> Self {
        BankConfig {
            open_sec: clock_time(9, 0),
            close_sec: clock_time(16, 0),
            arrival_interval: Bounds::new(60, 240),
            break_frequency: Bounds::new(1_800, 3_600),
            break_length: Bounds::new(60, 240),
            transaction_duration: Bounds::new(30, 360),
            num_tellers: 3,
            wait_cap_sec: 300,
            queue_capacity: 500,
            micros_per_sim_sec: DEFAULT_MICROS_PER_SIM_SEC,
            seed: None,
        }
    }
}

impl BankConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn clock(&self) -> SimClock {
        SimClock::from_micros(self.micros_per_sim_sec)
    }

    /// Most arrivals the generator can produce between open and close
    pub fn worst_case_arrivals(&self) -> usize {
        let open_for = self.close_sec.saturating_sub(self.open_sec);
        let fastest = self.arrival_interval.min.max(1);
        usize::try_from(open_for.div_ceil(fastest)).unwrap_or(usize::MAX)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.arrival_interval.check("arrival interval")?;
        self.break_frequency.check("break frequency")?;
        self.break_length.check("break length")?;
        self.transaction_duration.check("transaction duration")?;

        if self.arrival_interval.min == 0 {
            return Err(ConfigError::ZeroDuration {
                name: "arrival interval",
            });
        }
        if self.break_frequency.min == 0 {
            return Err(ConfigError::ZeroDuration {
                name: "break frequency",
            });
        }
        if self.wait_cap_sec == 0 {
            return Err(ConfigError::ZeroDuration { name: "wait cap" });
        }
        if self.num_tellers == 0 {
            return Err(ConfigError::NoTellers);
        }
        if self.close_sec <= self.open_sec {
            return Err(ConfigError::EmptyDay {
                open: self.open_sec,
                close: self.close_sec,
            });
        }

        let worst_case = self.worst_case_arrivals();
        if self.queue_capacity < worst_case {
            return Err(ConfigError::CapacityTooSmall {
                capacity: self.queue_capacity,
                worst_case,
            });
        }
        Ok(())
    }
}
