//! Bank counter simulation
//!
//! Customers arrive at random intervals, queue for one of several tellers and
//! are served for a random duration while a statistics thread summarizes the
//! day. Every actor runs on its own OS thread:
//!
//! - CustomerGenerator: produces arrivals, closes the queue at closing time
//! - TellerWorker: N consumers with independent break schedules
//! - StatisticsCollector: aggregates metric events until every teller is gone
//!
//! [`simulation::run_day`] wires them together and returns the day's report.

use sim_core::ClosableQueue;

// ============================================================================
// Modules
// ============================================================================

pub mod config;
pub mod customer_generator;
pub mod error;
pub mod report;
pub mod simulation;
pub mod statistics_collector;
pub mod teller;
pub mod time_of_day;

pub use config::{BankConfig, Bounds, ConfigError};
pub use customer_generator::{CustomerGenerator, GeneratorSummary};
pub use error::SimError;
pub use report::MetricsReport;
pub use simulation::{DayOutcome, run_day, run_days};
pub use statistics_collector::{MetricSeries, StatisticsCollector};
pub use teller::{TellerStatus, TellerSummary, TellerWorker};
pub use time_of_day::format_time_of_day;

/// Queue shared between the generator and the tellers
pub type CustomerQueue = ClosableQueue<Customer>;

// ============================================================================
// Customers
// ============================================================================

/// A bank customer and the times recorded for them
///
/// All times are simulated seconds. The customer is owned by exactly one
/// stage at a time: the generator, then the queue, then the serving teller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    id: usize,
    enqueue_sec: u64,
    dequeue_sec: u64,
    transaction_sec: u64,
}

impl Customer {
    /// Customer `id` joining the queue at `enqueue_sec`
    pub fn arrive(id: usize, enqueue_sec: u64) -> Self {
        Customer {
            id,
            enqueue_sec,
            dequeue_sec: enqueue_sec,
            transaction_sec: 0,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn enqueue_sec(&self) -> u64 {
        self.enqueue_sec
    }

    pub fn dequeue_sec(&self) -> u64 {
        self.dequeue_sec
    }

    /// Duration of the transaction with the teller
    pub fn transaction_sec(&self) -> u64 {
        self.transaction_sec
    }

    /// Record leaving the queue when the serving teller's clock reads
    /// `teller_clock`, returning the stamped time
    ///
    /// Clocks are per actor, so a teller may lag the generator. A customer is
    /// never taken before they arrived.
    pub fn stamp_dequeue(&mut self, teller_clock: u64) -> u64 {
        self.dequeue_sec = teller_clock.max(self.enqueue_sec);
        self.dequeue_sec
    }

    pub fn record_transaction(&mut self, duration_sec: u64) {
        self.transaction_sec = duration_sec;
    }

    pub fn queue_wait(&self) -> u64 {
        self.dequeue_sec - self.enqueue_sec
    }
}

// ============================================================================
// Metric events
// ============================================================================

/// Measurement sent from a teller to the statistics collector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricEvent {
    /// Seconds a customer spent queued before being served
    QueueWait { teller_id: usize, secs: u64 },

    /// Seconds spent on one customer's transaction
    Transaction { teller_id: usize, secs: u64 },

    /// Seconds a teller waited for the customer it then served
    TellerIdle { teller_id: usize, secs: u64 },
}

impl MetricEvent {
    pub fn teller_id(&self) -> usize {
        match self {
            MetricEvent::QueueWait { teller_id, .. }
            | MetricEvent::Transaction { teller_id, .. }
            | MetricEvent::TellerIdle { teller_id, .. } => *teller_id,
        }
    }
}
