//! Fixed-backoff retry of failed signals.
//!
//! Each scheduled retry is its own lightweight task that sleeps for the
//! backoff and then pushes the signal back onto the queue, so workers
//! never wait out a backoff. The number of such tasks is unbounded
//! unless a cap is configured; signals that would exceed the cap are
//! dropped.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use super::queue::SignalSender;
use super::signal::Signal;
use crate::server::Stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-enqueue after `after`; `attempt` is the new failure count.
    Scheduled { attempt: u32, after: Duration },
    /// Retry budget spent after `attempts` deliveries.
    Exhausted { attempts: u32 },
    /// Too many retries already waiting.
    Shed,
}

#[derive(Debug, Clone)]
pub struct RetryScheduler {
    queue: SignalSender,
    backoff: Duration,
    max_retries: u32,
    pending: Option<Arc<Semaphore>>,
    stats: Arc<Stats>,
}

impl RetryScheduler {
    #[must_use]
    pub fn new(
        queue: SignalSender,
        backoff: Duration,
        max_retries: u32,
        max_pending: Option<usize>,
        stats: Arc<Stats>,
    ) -> Self {
        Self {
            queue,
            backoff,
            max_retries,
            pending: max_pending.map(|n| Arc::new(Semaphore::new(n))),
            stats,
        }
    }

    /// Record a failed delivery of `signal` and decide its fate.
    ///
    /// A signal is delivered at most `max_retries + 1` times.
    pub fn schedule(&self, mut signal: Signal) -> RetryDecision {
        signal.attempt += 1;

        if signal.attempt > self.max_retries {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            return RetryDecision::Exhausted {
                attempts: signal.attempt,
            };
        }

        let permit = match &self.pending {
            Some(pending) => match Arc::clone(pending).try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                    return RetryDecision::Shed;
                }
            },
            None => None,
        };

        let decision = RetryDecision::Scheduled {
            attempt: signal.attempt,
            after: self.backoff,
        };

        tracing::info!(
            broadcast_id = %signal.broadcast_id,
            upstream = %signal.request.upstream(),
            attempt = signal.attempt,
            "retrying in {}ms",
            self.backoff.as_millis()
        );

        let queue = self.queue.clone();
        let stats = Arc::clone(&self.stats);
        let backoff = self.backoff;
        tokio::spawn(async move {
            tokio::time::sleep(backoff).await;
            drop(permit);
            if let Err(e) = queue.push(signal) {
                stats.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "failed to re-enqueue signal");
            }
        });

        self.stats.retried.fetch_add(1, Ordering::Relaxed);
        decision
    }
}
