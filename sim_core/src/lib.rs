//! Building blocks for thread-per-actor simulations
//!
//! - [`SimClock`]: scale between simulated seconds and wall-clock time
//! - [`SimRng`]: per-actor bounded random choice
//! - [`ClosableQueue`]: shared FIFO with a tri-state poll contract
//! - [`parallel`]: run many independent simulated days at once

pub mod clock;
pub mod parallel;
pub mod queue;
pub mod rng;

pub use clock::{DEFAULT_MICROS_PER_SIM_SEC, SimClock};
pub use queue::{ClosableQueue, Pollable, QueueError, QueueGuard};
pub use rng::SimRng;
