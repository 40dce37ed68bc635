//! Closable FIFO shared between one producer and many consumers
//!
//! The queue is guarded by a single mutex and a single condition variable.
//! All access goes through a [`QueueGuard`], so a caller can measure how long
//! it waited for the lock before stamping an item with its own clock.
//!
//! Consumers decide what to do from [`Pollable`]:
//!
//! - `Available`: at least one item is queued, take it
//! - `NoneYet`: nothing queued but the producer is still running, wait
//! - `Empty`: nothing queued and the producer has closed the queue, stop
//!
//! Closing is a one-way switch. Once closed the queue only drains.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tracing::trace;

/// Errors from misusing the queue
///
/// None of these happen in a correctly configured simulation. A push past
/// capacity means the capacity was sized below the worst-case number of
/// arrivals.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("push after the queue was closed")]
    Closed,

    #[error("queue capacity of {capacity} items exhausted")]
    AtCapacity { capacity: usize },

    #[error("poll on an empty queue")]
    Empty,
}

/// Outcome of asking whether an item can be taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pollable {
    Available,
    Empty,
    NoneYet,
}

#[derive(Debug)]
struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
    max_depth: usize,
    pushed: usize,
    polled: usize,
}

impl<T> QueueState<T> {
    fn record_depth(&mut self) {
        self.max_depth = self.max_depth.max(self.items.len());
    }
}

/// Lock-protected FIFO with a close flag and a depth watermark
///
/// `capacity` bounds the total number of items ever pushed, not the current
/// depth: it is sized for a whole simulated day up front.
#[derive(Debug)]
pub struct ClosableQueue<T> {
    state: Mutex<QueueState<T>>,
    signal: Condvar,
    capacity: usize,
}

impl<T> ClosableQueue<T> {
    pub fn new(capacity: usize) -> Self {
        ClosableQueue {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                closed: false,
                max_depth: 0,
                pushed: 0,
                polled: 0,
            }),
            signal: Condvar::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Acquire the queue lock
    ///
    /// A poisoned lock is recovered: every mutation completes while the guard
    /// is held, so a panicking holder cannot leave the state half-updated.
    pub fn lock(&self) -> QueueGuard<'_, T> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        QueueGuard { queue: self, state }
    }

    /// All-time high-water mark of the queue depth
    pub fn max_depth(&self) -> usize {
        self.lock().state.max_depth
    }

    pub fn pushed(&self) -> usize {
        self.lock().state.pushed
    }

    pub fn polled(&self) -> usize {
        self.lock().state.polled
    }
}

/// Exclusive access to the queue state
///
/// Dropping the guard releases the lock.
pub struct QueueGuard<'a, T> {
    queue: &'a ClosableQueue<T>,
    state: MutexGuard<'a, QueueState<T>>,
}

impl<'a, T> QueueGuard<'a, T> {
    /// Append to the tail and wake every waiter
    pub fn push(&mut self, item: T) -> Result<(), QueueError> {
        if self.state.closed {
            return Err(QueueError::Closed);
        }
        if self.state.pushed >= self.queue.capacity {
            return Err(QueueError::AtCapacity {
                capacity: self.queue.capacity,
            });
        }
        self.state.items.push_back(item);
        self.state.pushed += 1;
        self.state.record_depth();
        self.queue.signal.notify_all();
        Ok(())
    }

    /// Remove the head
    ///
    /// Callers check [`can_poll`](Self::can_poll) first; polling an empty
    /// queue is a logic error reported as [`QueueError::Empty`].
    pub fn poll(&mut self) -> Result<T, QueueError> {
        // depth may be observed here for the first time by a woken waiter
        self.state.record_depth();
        let item = self.state.items.pop_front().ok_or(QueueError::Empty)?;
        self.state.polled += 1;
        Ok(item)
    }

    pub fn peek(&self) -> Option<&T> {
        self.state.items.front()
    }

    pub fn can_poll(&self) -> Pollable {
        if !self.state.items.is_empty() {
            Pollable::Available
        } else if self.state.closed {
            Pollable::Empty
        } else {
            Pollable::NoneYet
        }
    }

    /// Mark the queue closed and release every waiter
    ///
    /// Closing twice is harmless.
    pub fn close(&mut self) {
        if !self.state.closed {
            trace!(pushed = self.state.pushed, "queue closed");
        }
        self.state.closed = true;
        self.queue.signal.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed
    }

    pub fn depth(&self) -> usize {
        self.state.items.len()
    }

    /// Release the lock and wait for a push or close, at most `timeout`
    ///
    /// Returns the reacquired guard and whether the wait timed out. A wake
    /// does not mean an item is available; re-check
    /// [`can_poll`](Self::can_poll).
    pub fn wait_timeout(self, timeout: Duration) -> (Self, bool) {
        let QueueGuard { queue, state } = self;
        let (state, result) = queue
            .signal
            .wait_timeout(state, timeout)
            .unwrap_or_else(PoisonError::into_inner);
        (QueueGuard { queue, state }, result.timed_out())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_can_poll_states() {
        let queue = ClosableQueue::new(10);
        let mut guard = queue.lock();
        assert_eq!(guard.can_poll(), Pollable::NoneYet);

        guard.push(1).unwrap();
        assert_eq!(guard.can_poll(), Pollable::Available);

        guard.close();
        // items still queued take priority over the closed flag
        assert_eq!(guard.can_poll(), Pollable::Available);

        guard.poll().unwrap();
        assert_eq!(guard.can_poll(), Pollable::Empty);
    }

    #[test]
    fn test_fifo_order() {
        let queue = ClosableQueue::new(10);
        let mut guard = queue.lock();
        for i in 0..5 {
            guard.push(i).unwrap();
        }
        let drained: Vec<i32> = (0..5).map(|_| guard.poll().unwrap()).collect();
        assert_eq!(drained, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_push_after_close_fails() {
        let queue = ClosableQueue::new(10);
        let mut guard = queue.lock();
        guard.close();
        guard.close();
        assert!(guard.is_closed());
        assert_eq!(guard.push(1), Err(QueueError::Closed));
        assert_eq!(guard.depth(), 0);
    }

    #[test]
    fn test_capacity_counts_total_pushes() {
        let queue = ClosableQueue::new(2);
        let mut guard = queue.lock();
        guard.push(1).unwrap();
        guard.poll().unwrap();
        guard.push(2).unwrap();
        guard.poll().unwrap();
        assert_eq!(guard.push(3), Err(QueueError::AtCapacity { capacity: 2 }));
    }

    #[test]
    fn test_poll_empty_is_error() {
        let queue: ClosableQueue<u8> = ClosableQueue::new(1);
        assert_eq!(queue.lock().poll(), Err(QueueError::Empty));
    }

    #[test]
    fn test_max_depth_is_watermark() {
        let queue = ClosableQueue::new(10);
        {
            let mut guard = queue.lock();
            guard.push(1).unwrap();
            guard.push(2).unwrap();
            guard.push(3).unwrap();
            guard.poll().unwrap();
            guard.poll().unwrap();
            guard.push(4).unwrap();
        }
        assert_eq!(queue.max_depth(), 3);
        assert_eq!(queue.pushed(), 4);
        assert_eq!(queue.polled(), 2);
    }

    #[test]
    fn test_wait_timeout_expires() {
        let queue: ClosableQueue<u8> = ClosableQueue::new(1);
        let mut guard = queue.lock();
        let start = Instant::now();
        // spurious wakes are allowed, so loop until the timeout is reported
        loop {
            let (next, timed_out) = guard.wait_timeout(Duration::from_millis(10));
            guard = next;
            assert_eq!(guard.can_poll(), Pollable::NoneYet);
            if timed_out {
                break;
            }
        }
        assert!(start.elapsed() >= Duration::from_millis(10));
    }

    #[test]
    fn test_close_wakes_waiter() {
        let queue = Arc::new(ClosableQueue::<u8>::new(1));
        let waiter = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let mut guard = queue.lock();
                loop {
                    match guard.can_poll() {
                        Pollable::Empty => return true,
                        Pollable::Available => return false,
                        Pollable::NoneYet => {
                            guard = guard.wait_timeout(Duration::from_secs(5)).0;
                        }
                    }
                }
            })
        };
        thread::sleep(Duration::from_millis(10));
        queue.lock().close();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_concurrent_consumers_see_fifo() {
        let queue = Arc::new(ClosableQueue::<usize>::new(1000));
        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    let mut taken = Vec::new();
                    let mut guard = queue.lock();
                    loop {
                        match guard.can_poll() {
                            Pollable::Available => taken.push(guard.poll().unwrap()),
                            Pollable::Empty => return taken,
                            Pollable::NoneYet => {
                                guard = guard.wait_timeout(Duration::from_millis(50)).0;
                            }
                        }
                    }
                })
            })
            .collect();

        for i in 0..1000 {
            queue.lock().push(i).unwrap();
        }
        queue.lock().close();

        let mut all = Vec::new();
        for consumer in consumers {
            let taken = consumer.join().unwrap();
            // each consumer sees a strictly increasing subsequence
            assert!(taken.windows(2).all(|w| w[0] < w[1]));
            all.extend(taken);
        }
        all.sort_unstable();
        assert_eq!(all, (0..1000).collect::<Vec<_>>());
        assert_eq!(queue.pushed(), queue.polled());
        assert!(queue.max_depth() >= 1);
    }
}
