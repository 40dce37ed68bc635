use std::time::Duration;

use crossbeam::channel::{Receiver, RecvTimeoutError};
use tracing::{debug, trace};

use crate::MetricEvent;

/// How long the collector blocks on the channel before logging that it is
/// still waiting
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Raw measurements gathered over a day
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricSeries {
    pub customers_served: usize,
    pub queue_wait: Vec<u64>,
    pub transaction: Vec<u64>,
    pub teller_idle: Vec<u64>,
    /// Customers served, indexed by teller id
    pub served_by_teller: Vec<usize>,
}

impl MetricSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: MetricEvent) {
        match event {
            MetricEvent::QueueWait { teller_id, secs } => {
                self.customers_served += 1;
                self.queue_wait.push(secs);
                if self.served_by_teller.len() <= teller_id {
                    self.served_by_teller.resize(teller_id + 1, 0);
                }
                self.served_by_teller[teller_id] += 1;
            }
            MetricEvent::Transaction { secs, .. } => self.transaction.push(secs),
            MetricEvent::TellerIdle { secs, .. } => self.teller_idle.push(secs),
        }
    }
}

/// Aggregates metric events until every sender is gone
///
/// There is no stop message: the collector finishes when the channel reports
/// that all tellers have dropped their senders.
pub struct StatisticsCollector {
    receiver: Receiver<MetricEvent>,
    poll_interval: Duration,
    series: MetricSeries,
}

impl StatisticsCollector {
    pub fn new(receiver: Receiver<MetricEvent>) -> Self {
        Self::with_poll_interval(receiver, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(receiver: Receiver<MetricEvent>, poll_interval: Duration) -> Self {
        StatisticsCollector {
            receiver,
            poll_interval,
            series: MetricSeries::new(),
        }
    }

    pub fn run(mut self) -> MetricSeries {
        loop {
            match self.receiver.recv_timeout(self.poll_interval) {
                Ok(event) => {
                    trace!(teller = event.teller_id(), ?event, "metric received");
                    self.series.record(event);
                }
                Err(RecvTimeoutError::Timeout) => {
                    trace!(
                        served = self.series.customers_served,
                        "no metrics yet, still listening"
                    );
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!(
            served = self.series.customers_served,
            "all tellers gone, statistics closed"
        );
        self.series
    }
}
