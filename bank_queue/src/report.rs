//! End-of-day report

use std::fmt;

use serde::Serialize;

use crate::statistics_collector::MetricSeries;

/// Summary of a simulated day
///
/// `Display` renders the fixed eight-line report; all durations are
/// simulated seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsReport {
    pub customers_served: usize,
    pub average_queue_wait: u64,
    pub max_queue_wait: u64,
    pub average_transaction: u64,
    pub max_transaction: u64,
    pub average_teller_idle: u64,
    pub max_teller_idle: u64,
    pub max_queue_depth: usize,
    pub served_by_teller: Vec<usize>,
}

impl MetricsReport {
    pub fn from_series(series: &MetricSeries, max_queue_depth: usize) -> Self {
        MetricsReport {
            customers_served: series.customers_served,
            average_queue_wait: average(&series.queue_wait),
            max_queue_wait: maximum(&series.queue_wait),
            average_transaction: average(&series.transaction),
            max_transaction: maximum(&series.transaction),
            average_teller_idle: average(&series.teller_idle),
            max_teller_idle: maximum(&series.teller_idle),
            max_queue_depth,
            served_by_teller: series.served_by_teller.clone(),
        }
    }
}

/// Integer average with a divisor of `count + 1`
///
/// The extra one in the divisor is the long-standing reporting convention and
/// is kept as is: `[10, 20]` averages to `30 / 3 = 10`, and an empty series
/// averages to zero.
pub fn average(series: &[u64]) -> u64 {
    let sum: u64 = series.iter().sum();
    sum / (series.len() as u64 + 1)
}

/// Largest value in the series, zero when empty
pub fn maximum(series: &[u64]) -> u64 {
    series.iter().copied().max().unwrap_or(0)
}

impl fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Customers served: {}", self.customers_served)?;
        writeln!(f, "Average queue wait: {} s", self.average_queue_wait)?;
        writeln!(f, "Maximum queue wait: {} s", self.max_queue_wait)?;
        writeln!(f, "Average transaction time: {} s", self.average_transaction)?;
        writeln!(f, "Maximum transaction time: {} s", self.max_transaction)?;
        writeln!(f, "Average teller idle time: {} s", self.average_teller_idle)?;
        writeln!(f, "Maximum teller idle time: {} s", self.max_teller_idle)?;
        write!(f, "Maximum queue depth: {}", self.max_queue_depth)
    }
}
