//! Teller threads
//!
//! A teller cycles through
//!
//! ```text
//! ClockedIn -> (Waiting <-> OnBreak) -> Serving -> Waiting -> ... -> ClockedOut
//! ```
//!
//! and only clocks out from `Waiting`, after the queue reports `Empty`.
//! Breaks follow a private schedule. The wait on the queue is bounded by the
//! next break and by a fixed cap, so a teller never sleeps through its break.

use std::sync::Arc;
use std::time::Instant;

use crossbeam::channel::Sender;
use sim_core::{Pollable, SimClock, SimRng};
use tracing::{debug, trace, warn};

use crate::config::{BankConfig, Bounds};
use crate::time_of_day::format_time_of_day;
use crate::{Customer, CustomerQueue, MetricEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TellerStatus {
    ClockedIn,
    Waiting,
    OnBreak,
    Serving,
    ClockedOut,
}

/// What a teller did over the day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TellerSummary {
    pub teller_id: usize,
    pub customers_served: usize,
    pub breaks_taken: usize,
    /// Teller clock when it clocked out
    pub clocked_out_at: u64,
    pub status: TellerStatus,
}

enum WaitOutcome {
    Customer { customer: Customer, idle_from: u64 },
    BreakDue,
    ClosedAndDrained,
}

pub struct TellerWorker {
    id: usize,
    queue: Arc<CustomerQueue>,
    metrics: Sender<MetricEvent>,
    clock: SimClock,
    rng: SimRng,
    break_frequency: Bounds,
    break_length: Bounds,
    transaction_duration: Bounds,
    wait_cap_sec: u64,
    now: u64,
    next_break: u64,
    status: TellerStatus,
    customers_served: usize,
    breaks_taken: usize,
}

impl TellerWorker {
    pub fn new(
        id: usize,
        config: &BankConfig,
        queue: Arc<CustomerQueue>,
        metrics: Sender<MetricEvent>,
        mut rng: SimRng,
    ) -> Self {
        let now = config.open_sec;
        let next_break = now + rng.choose(config.break_frequency.min, config.break_frequency.max);
        TellerWorker {
            id,
            queue,
            metrics,
            clock: config.clock(),
            rng,
            break_frequency: config.break_frequency,
            break_length: config.break_length,
            transaction_duration: config.transaction_duration,
            wait_cap_sec: config.wait_cap_sec,
            now,
            next_break,
            status: TellerStatus::ClockedIn,
            customers_served: 0,
            breaks_taken: 0,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Work until the queue is closed and drained
    ///
    /// Consumes the worker; its metrics sender is dropped on return, which is
    /// how the statistics collector learns the teller is done.
    pub fn run(mut self) -> TellerSummary {
        debug!(
            teller = self.id,
            at = %format_time_of_day(self.now),
            next_break = %format_time_of_day(self.next_break),
            "clocked in"
        );

        loop {
            if self.now >= self.next_break {
                self.take_break();
                continue;
            }
            match self.wait_for_customer() {
                WaitOutcome::Customer {
                    customer,
                    idle_from,
                } => self.serve(customer, idle_from),
                WaitOutcome::BreakDue => continue,
                WaitOutcome::ClosedAndDrained => break,
            }
        }

        self.transition(TellerStatus::ClockedOut);
        debug!(
            teller = self.id,
            served = self.customers_served,
            breaks = self.breaks_taken,
            "clocked out"
        );

        TellerSummary {
            teller_id: self.id,
            customers_served: self.customers_served,
            breaks_taken: self.breaks_taken,
            clocked_out_at: self.now,
            status: self.status,
        }
    }

    fn transition(&mut self, status: TellerStatus) {
        trace!(
            teller = self.id,
            from = ?self.status,
            to = ?status,
            at = %format_time_of_day(self.now),
            "teller state"
        );
        self.status = status;
    }

    fn take_break(&mut self) {
        self.transition(TellerStatus::OnBreak);
        let length = self.rng.choose(self.break_length.min, self.break_length.max);
        self.now = self.clock.sleep_and_advance(length, self.now);
        let until_next = self
            .rng
            .choose(self.break_frequency.min, self.break_frequency.max);
        self.next_break = self.now + until_next;
        self.breaks_taken += 1;
        debug!(
            teller = self.id,
            length,
            back_at = %format_time_of_day(self.now),
            "break over"
        );
    }

    fn wait_for_customer(&mut self) -> WaitOutcome {
        self.transition(TellerStatus::Waiting);
        let idle_from = self.now;

        let lock_start = Instant::now();
        let mut queue = self.queue.lock();
        self.now += self.clock.elapsed_since(lock_start);

        loop {
            match queue.can_poll() {
                Pollable::Available => match queue.poll() {
                    Ok(mut customer) => {
                        self.now = customer.stamp_dequeue(self.now);
                        return WaitOutcome::Customer {
                            customer,
                            idle_from,
                        };
                    }
                    Err(e) => warn!(teller = self.id, error = %e, "queue emptied under lock"),
                },
                Pollable::Empty => return WaitOutcome::ClosedAndDrained,
                Pollable::NoneYet => {}
            }

            let until_break = self.next_break.saturating_sub(self.now);
            if until_break == 0 {
                return WaitOutcome::BreakDue;
            }
            let bound = until_break.min(self.wait_cap_sec);

            let wait_start = Instant::now();
            let (reacquired, timed_out) = queue.wait_timeout(self.clock.to_real(bound));
            queue = reacquired;

            self.now = clock_after_wait(
                self.now,
                bound,
                timed_out,
                queue.peek().map(Customer::enqueue_sec),
                self.clock.elapsed_since(wait_start),
            );
        }
    }

    fn serve(&mut self, mut customer: Customer, idle_from: u64) {
        self.transition(TellerStatus::Serving);
        let dequeue_sec = customer.dequeue_sec();
        self.send(MetricEvent::QueueWait {
            teller_id: self.id,
            secs: customer.queue_wait(),
        });
        self.send(MetricEvent::TellerIdle {
            teller_id: self.id,
            secs: dequeue_sec.saturating_sub(idle_from),
        });

        let duration = self
            .rng
            .choose(self.transaction_duration.min, self.transaction_duration.max);
        self.now = self.clock.sleep_and_advance(duration, self.now);
        customer.record_transaction(duration);
        self.send(MetricEvent::Transaction {
            teller_id: self.id,
            secs: customer.transaction_sec(),
        });

        self.customers_served += 1;
        debug!(
            teller = self.id,
            customer = customer.id(),
            waited = customer.queue_wait(),
            took = duration,
            done_at = %format_time_of_day(self.now),
            "customer served"
        );
    }

    fn send(&self, event: MetricEvent) {
        if self.metrics.send(event).is_err() {
            warn!(teller = self.id, ?event, "statistics collector gone, metric dropped");
        }
    }
}

/// Teller clock after a bounded wait on the queue
///
/// A queued customer pulls an idle teller's clock up to their arrival. When
/// the wait also timed out, the clock never moves past the bound, so a push
/// racing the timeout is not charged as queue wait.
fn clock_after_wait(
    now: u64,
    bound: u64,
    timed_out: bool,
    head_enqueue: Option<u64>,
    elapsed: u64,
) -> u64 {
    match (head_enqueue, timed_out) {
        (Some(enqueue), false) => now.max(enqueue),
        (Some(enqueue), true) => now.max(enqueue).min(now + bound),
        (None, true) => now + bound,
        // spurious wake
        (None, false) => now + elapsed.min(bound),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::unbounded;
    use std::thread;
    use std::time::Duration;

    fn fast_config() -> BankConfig {
        BankConfig {
            open_sec: 0,
            close_sec: 1_000,
            break_frequency: Bounds::fixed(1_000_000),
            transaction_duration: Bounds::fixed(50),
            micros_per_sim_sec: 200,
            ..BankConfig::default()
        }
    }

    #[test]
    fn test_drains_closed_queue_then_clocks_out() {
        let config = fast_config();
        let queue = Arc::new(CustomerQueue::new(10));
        {
            let mut guard = queue.lock();
            guard.push(Customer::arrive(1, 0)).unwrap();
            guard.push(Customer::arrive(2, 0)).unwrap();
            guard.close();
        }
        let (sender, receiver) = unbounded();
        let teller = TellerWorker::new(0, &config, Arc::clone(&queue), sender, SimRng::seeded(1));

        let summary = teller.run();

        assert_eq!(summary.status, TellerStatus::ClockedOut);
        assert_eq!(summary.customers_served, 2);
        assert!(summary.clocked_out_at >= 100);

        // sender dropped with the worker, so the channel drains and closes
        let events: Vec<MetricEvent> = receiver.iter().collect();
        assert_eq!(events.len(), 6);
        let waits: Vec<u64> = events
            .iter()
            .filter_map(|e| match e {
                MetricEvent::QueueWait { secs, .. } => Some(*secs),
                _ => None,
            })
            .collect();
        // the second customer waited out the first one's transaction
        assert_eq!(waits.len(), 2);
        assert!(waits[1] >= 50);
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, MetricEvent::Transaction { secs: 50, .. }))
                .count(),
            2
        );
    }

    #[test]
    fn test_waits_for_arrival_and_exits_on_close() {
        let config = fast_config();
        let queue = Arc::new(CustomerQueue::new(10));
        let (sender, receiver) = unbounded();
        let teller = TellerWorker::new(3, &config, Arc::clone(&queue), sender, SimRng::seeded(1));
        let handle = thread::spawn(move || teller.run());

        thread::sleep(Duration::from_millis(5));
        {
            let mut guard = queue.lock();
            guard.push(Customer::arrive(1, 400)).unwrap();
            guard.close();
        }

        let summary = handle.join().unwrap();
        assert_eq!(summary.customers_served, 1);
        assert_eq!(summary.status, TellerStatus::ClockedOut);

        let events: Vec<MetricEvent> = receiver.iter().collect();
        assert!(events.iter().all(|e| e.teller_id() == 3));
        let idle = events.iter().find_map(|e| match e {
            MetricEvent::TellerIdle { secs, .. } => Some(*secs),
            _ => None,
        });
        // woken at 400 after waiting since opening
        assert_eq!(idle, Some(400));
    }

    #[test]
    fn test_takes_breaks_while_queue_is_quiet() {
        let config = BankConfig {
            break_frequency: Bounds::fixed(100),
            break_length: Bounds::fixed(10),
            ..fast_config()
        };
        let queue = Arc::new(CustomerQueue::new(10));
        let (sender, _receiver) = unbounded();
        let teller = TellerWorker::new(0, &config, Arc::clone(&queue), sender, SimRng::seeded(1));
        let handle = thread::spawn(move || teller.run());

        // roughly 500 simulated seconds of an empty, open queue
        thread::sleep(Duration::from_millis(100));
        queue.lock().close();

        let summary = handle.join().unwrap();
        assert!(summary.breaks_taken >= 1);
        assert_eq!(summary.customers_served, 0);
        assert_eq!(summary.status, TellerStatus::ClockedOut);
    }

    #[test]
    fn test_keeps_working_when_collector_is_gone() {
        let config = fast_config();
        let queue = Arc::new(CustomerQueue::new(10));
        {
            let mut guard = queue.lock();
            guard.push(Customer::arrive(1, 0)).unwrap();
            guard.close();
        }
        let (sender, receiver) = unbounded();
        drop(receiver);

        let summary = TellerWorker::new(0, &config, queue, sender, SimRng::seeded(1)).run();
        assert_eq!(summary.customers_served, 1);
    }

    #[test]
    fn test_idle_restarts_after_break() {
        let config = BankConfig {
            break_length: Bounds::fixed(40),
            ..fast_config()
        };
        let queue = Arc::new(CustomerQueue::new(10));
        queue.lock().push(Customer::arrive(1, 100)).unwrap();
        let (sender, receiver) = unbounded();
        let mut teller =
            TellerWorker::new(0, &config, Arc::clone(&queue), sender, SimRng::seeded(1));

        teller.take_break();
        assert_eq!(teller.now, 40);
        match teller.wait_for_customer() {
            WaitOutcome::Customer {
                customer,
                idle_from,
            } => {
                assert_eq!(idle_from, 40);
                teller.serve(customer, idle_from);
            }
            _ => panic!("expected the queued customer"),
        }
        drop(teller);

        let events: Vec<MetricEvent> = receiver.iter().collect();
        assert!(events.contains(&MetricEvent::QueueWait {
            teller_id: 0,
            secs: 0
        }));
        assert!(events.contains(&MetricEvent::TellerIdle {
            teller_id: 0,
            secs: 60
        }));
    }

    #[test]
    fn test_clock_after_wait() {
        // notified by an arrival ahead of the teller's clock
        assert_eq!(clock_after_wait(900, 300, false, Some(1_200), 0), 1_200);
        // arrival already behind the clock
        assert_eq!(clock_after_wait(900, 300, false, Some(800), 0), 900);
        // timed out with nobody queued
        assert_eq!(clock_after_wait(900, 300, true, None, 450), 1_200);
        // spurious wake folds in measured time, capped at the bound
        assert_eq!(clock_after_wait(900, 300, false, None, 20), 920);
        assert_eq!(clock_after_wait(900, 300, false, None, 999), 1_200);
    }

    #[test]
    fn test_push_racing_timeout_is_not_charged_as_wait() {
        // timed out, but a customer who arrived at 950 is queued
        let now = clock_after_wait(900, 300, true, Some(950), 300);
        assert_eq!(now, 950);

        let mut customer = Customer::arrive(1, 950);
        customer.stamp_dequeue(now);
        assert_eq!(customer.queue_wait(), 0);

        // never past the bound
        assert_eq!(clock_after_wait(900, 300, true, Some(5_000), 300), 1_200);
    }
}
