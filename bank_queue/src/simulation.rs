//! Wiring for a simulated day
//!
//! One day runs on `num_tellers + 2` OS threads: the statistics collector, the
//! tellers and the customer generator. They share nothing but the customer
//! queue and the metric channel.
//!
//! Shutdown is driven entirely by ownership:
//!
//! 1. The generator closes the queue after its last arrival.
//! 2. Each teller drains the closed queue, clocks out and drops its sender.
//! 3. The collector sees the channel disconnect once the last sender is gone.

use std::any::Any;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::unbounded;
use sim_core::SimRng;
use sim_core::parallel::{ParallelRunner, simple_progress_reporter};
use tracing::{info, warn};

use crate::CustomerQueue;
use crate::config::BankConfig;
use crate::customer_generator::CustomerGenerator;
use crate::error::SimError;
use crate::report::MetricsReport;
use crate::statistics_collector::StatisticsCollector;
use crate::teller::{TellerSummary, TellerWorker};
use crate::time_of_day::format_time_of_day;

/// Everything a finished day produced
#[derive(Debug, Clone)]
pub struct DayOutcome {
    pub report: MetricsReport,
    pub customers_generated: usize,
    pub tellers: Vec<TellerSummary>,
}

/// Closes the queue when dropped, so tellers are released even if the
/// generator thread unwinds
struct DoorsClosed(Arc<CustomerQueue>);

impl Drop for DoorsClosed {
    fn drop(&mut self) {
        self.0.lock().close();
    }
}

/// Simulate one day and report on it
///
/// Every spawned thread is joined before any error is returned.
pub fn run_day(config: &BankConfig) -> Result<DayOutcome, SimError> {
    config.validate()?;

    let queue = Arc::new(CustomerQueue::new(config.queue_capacity));
    info!(
        tellers = config.num_tellers,
        open = %format_time_of_day(config.open_sec),
        close = %format_time_of_day(config.close_sec),
        capacity = queue.capacity(),
        micros_per_sim_sec = config.clock().real_per_sim().as_micros(),
        seed = ?config.seed,
        "bank opening"
    );
    let (sender, receiver) = unbounded();

    let collector = spawn_actor("statistics".to_string(), move || {
        StatisticsCollector::new(receiver).run()
    })?;

    let mut tellers = Vec::with_capacity(config.num_tellers);
    let mut spawn_error = None;
    for id in 0..config.num_tellers {
        let worker = TellerWorker::new(
            id,
            config,
            Arc::clone(&queue),
            sender.clone(),
            SimRng::for_actor(config.seed, id as u64 + 1),
        );
        match spawn_actor(format!("teller-{}", worker.id()), move || worker.run()) {
            Ok(handle) => tellers.push(handle),
            Err(e) => {
                spawn_error = Some(e);
                break;
            }
        }
    }
    // tellers hold the only senders from here on
    drop(sender);

    let generator = match spawn_error {
        Some(e) => Err(e),
        None => {
            let generator = CustomerGenerator::new(
                config,
                Arc::clone(&queue),
                SimRng::for_actor(config.seed, 0),
            );
            let doors = DoorsClosed(Arc::clone(&queue));
            spawn_actor("generator".to_string(), move || {
                let _doors = doors;
                generator.run()
            })
        }
    };
    if let Err(e) = &generator {
        warn!(error = %e, "closing early, not every actor started");
        queue.lock().close();
    }

    let generated = generator.and_then(|handle| join_actor("generator", handle));
    let summaries: Vec<Result<TellerSummary, SimError>> = tellers
        .into_iter()
        .enumerate()
        .map(|(id, handle)| join_actor(&format!("teller-{id}"), handle))
        .collect();
    let series = join_actor("statistics", collector);

    let generated = generated??;
    let tellers = summaries.into_iter().collect::<Result<Vec<_>, _>>()?;
    let series = series?;

    let report = MetricsReport::from_series(&series, queue.max_depth());
    if report.customers_served != generated.customers_generated {
        warn!(
            served = report.customers_served,
            generated = generated.customers_generated,
            "not every customer was served"
        );
    }
    info!(
        served = report.customers_served,
        max_queue_depth = report.max_queue_depth,
        closed_at = %format_time_of_day(generated.closed_at),
        "bank closed"
    );

    Ok(DayOutcome {
        report,
        customers_generated: generated.customers_generated,
        tellers,
    })
}

/// Simulate `days` independent days, `threads` of them at a time
///
/// With a base seed each day gets its own derived seed, so a batch is
/// reproducible day by day regardless of scheduling.
pub fn run_days(
    config: &BankConfig,
    days: usize,
    threads: Option<usize>,
) -> Vec<Result<DayOutcome, SimError>> {
    let mut runner = ParallelRunner::new(days, |day| {
        let day_config = BankConfig {
            seed: config.seed.map(|seed| day_seed(seed, day)),
            ..config.clone()
        };
        run_day(&day_config)
    })
    .progress(simple_progress_reporter(days.div_ceil(10).max(1)));
    if let Some(n) = threads {
        runner = runner.num_threads(n);
    }

    runner
        .run()
        .into_iter()
        .map(|day| day.unwrap_or_else(|panic| Err(SimError::ActorPanicked(panic))))
        .collect()
}

/// Base seed for `day`, spaced so the per-actor offsets of neighbouring days
/// never overlap
fn day_seed(seed: u64, day: usize) -> u64 {
    seed.wrapping_add((day as u64) << 32)
}

fn spawn_actor<T, F>(actor: String, body: F) -> Result<JoinHandle<T>, SimError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    thread::Builder::new()
        .name(actor.clone())
        .spawn(body)
        .map_err(|source| SimError::Spawn { actor, source })
}

fn join_actor<T>(actor: &str, handle: JoinHandle<T>) -> Result<T, SimError> {
    handle
        .join()
        .map_err(|panic| SimError::ActorPanicked(format!("{actor}: {}", panic_message(&*panic))))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
