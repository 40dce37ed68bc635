use std::sync::Arc;
use std::time::Instant;

use sim_core::{QueueError, SimClock, SimRng};
use tracing::{debug, error, info};

use crate::config::{BankConfig, Bounds};
use crate::time_of_day::format_time_of_day;
use crate::{Customer, CustomerQueue};

/// What the generator did over the day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorSummary {
    pub customers_generated: usize,
    /// Generator clock when it closed the queue
    pub closed_at: u64,
}

/// Produces customer arrivals until closing time, then closes the queue
pub struct CustomerGenerator {
    queue: Arc<CustomerQueue>,
    clock: SimClock,
    rng: SimRng,
    arrival_interval: Bounds,
    open_sec: u64,
    close_sec: u64,
}

impl CustomerGenerator {
    pub fn new(config: &BankConfig, queue: Arc<CustomerQueue>, rng: SimRng) -> Self {
        CustomerGenerator {
            queue,
            clock: config.clock(),
            rng,
            arrival_interval: config.arrival_interval,
            open_sec: config.open_sec,
            close_sec: config.close_sec,
        }
    }

    /// Generate arrivals for the whole day
    ///
    /// The queue is closed on every exit path. Tellers block on it until it
    /// is, so a failed push still closes before the error is returned.
    pub fn run(mut self) -> Result<GeneratorSummary, QueueError> {
        let mut now = self.open_sec;
        let mut next_id = 1;

        while now < self.close_sec {
            let delay = self
                .rng
                .choose(self.arrival_interval.min, self.arrival_interval.max);
            now = self.clock.sleep_and_advance(delay, now);

            let lock_start = Instant::now();
            let mut queue = self.queue.lock();
            now += self.clock.elapsed_since(lock_start);

            if let Err(e) = queue.push(Customer::arrive(next_id, now)) {
                queue.close();
                error!(customer = next_id, error = %e, "arrival rejected, closing early");
                return Err(e);
            }
            debug!(
                customer = next_id,
                at = %format_time_of_day(now),
                depth = queue.depth(),
                "customer arrived"
            );
            next_id += 1;
        }

        self.queue.lock().close();

        let customers_generated = next_id - 1;
        info!(
            customers_generated,
            at = %format_time_of_day(now),
            "doors closed"
        );
        Ok(GeneratorSummary {
            customers_generated,
            closed_at: now,
        })
    }
}
