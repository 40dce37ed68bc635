//! Parallel execution of independent simulated days
//!
//! Every day is self-contained: it builds its own queue, spawns its own actor
//! threads and returns its own result. This module fans a batch of days out
//! over a rayon pool and collects the results in day order.
//!
//! # Example
//!
//! ```rust
//! use sim_core::parallel::{ParallelRunner, simple_progress_reporter};
//!
//! let results = ParallelRunner::new(8, |day| day * 2)
//!     .progress(simple_progress_reporter(4))
//!     .num_threads(2)
//!     .run();
//!
//! assert_eq!(results.len(), 8);
//! assert_eq!(results[3], Ok(6));
//! ```
//!
//! # Determinism
//!
//! The runner itself adds no randomness. A day closure that derives its seed
//! from the day index produces the same random draws regardless of thread
//! count or completion order.
//!
//! # Error Handling
//!
//! A panic inside one day is caught and returned as `Err(String)`. The other
//! days keep running.

use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Runs `num_days` independent days in parallel
///
/// The day closure `F` receives the day index and returns that day's result.
pub struct ParallelRunner<R, F>
where
    F: Fn(usize) -> R + Send + Sync,
    R: Send,
{
    num_days: usize,
    day: F,
    num_threads: Option<usize>,
    progress_callback: Option<ProgressCallback>,
}

impl<R, F> ParallelRunner<R, F>
where
    F: Fn(usize) -> R + Send + Sync,
    R: Send,
{
    pub fn new(num_days: usize, day: F) -> Self {
        ParallelRunner {
            num_days,
            day,
            num_threads: None,
            progress_callback: None,
        }
    }

    /// Set number of pool threads (defaults to rayon's global pool)
    ///
    /// Each day also spawns its own actor threads, so a small pool keeps the
    /// total thread count in check.
    pub fn num_threads(mut self, n: usize) -> Self {
        self.num_threads = Some(n);
        self
    }

    /// Called with `(completed, total)` after each day finishes
    pub fn progress<P>(mut self, callback: P) -> Self
    where
        P: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    /// Execute all days and return results in day order
    ///
    /// A day that panics yields `Err` with the panic message.
    pub fn run(self) -> Vec<Result<R, String>> {
        let progress_counter = AtomicUsize::new(0);

        let pool = self.num_threads.and_then(|n| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| warn!(error = %e, "falling back to global rayon pool"))
                .ok()
        });

        let execute = || {
            (0..self.num_days)
                .into_par_iter()
                .map(|day| {
                    let result =
                        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| (self.day)(day)));

                    let completed = progress_counter.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(ref callback) = self.progress_callback {
                        callback(completed, self.num_days);
                    }

                    result.map_err(|panic| {
                        if let Some(s) = panic.downcast_ref::<&str>() {
                            s.to_string()
                        } else if let Some(s) = panic.downcast_ref::<String>() {
                            s.clone()
                        } else {
                            "Unknown panic".to_string()
                        }
                    })
                })
                .collect()
        };

        if let Some(pool) = pool {
            pool.install(execute)
        } else {
            execute()
        }
    }
}

/// Progress callback that logs every `interval` completed days
pub fn simple_progress_reporter(interval: usize) -> impl Fn(usize, usize) + Send + Sync {
    let interval = interval.max(1);
    move |completed, total| {
        if completed.is_multiple_of(interval) || completed == total {
            info!(completed, total, "simulated days finished");
        }
    }
}
