//! FIFO signal queue shared by ingress, retry tasks and workers.
//!
//! Built on `tokio::sync::mpsc`. Producers hold a cloneable
//! [`SignalSender`]; the single receiver is wrapped in a mutex so the
//! worker pool can share it as a [`SignalReceiver`]. The queue is
//! unbounded unless a capacity is configured. A bounded queue never
//! blocks a producer: a full queue rejects the push instead.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use super::signal::Signal;
use crate::error::PurgecastError;

#[derive(Debug, Clone)]
enum Tx {
    Bounded(mpsc::Sender<Signal>),
    Unbounded(mpsc::UnboundedSender<Signal>),
}

#[derive(Debug)]
enum Rx {
    Bounded(mpsc::Receiver<Signal>),
    Unbounded(mpsc::UnboundedReceiver<Signal>),
}

impl Rx {
    async fn recv(&mut self) -> Option<Signal> {
        match self {
            Self::Bounded(rx) => rx.recv().await,
            Self::Unbounded(rx) => rx.recv().await,
        }
    }
}

/// Create a queue. `None` means unbounded.
#[must_use]
pub fn signal_queue(capacity: Option<usize>) -> (SignalSender, SignalReceiver) {
    let depth = Arc::new(AtomicUsize::new(0));

    let (tx, rx) = match capacity {
        Some(cap) => {
            let (tx, rx) = mpsc::channel(cap.max(1));
            (Tx::Bounded(tx), Rx::Bounded(rx))
        }
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            (Tx::Unbounded(tx), Rx::Unbounded(rx))
        }
    };

    (
        SignalSender {
            tx,
            depth: Arc::clone(&depth),
            capacity,
        },
        SignalReceiver {
            rx: Arc::new(Mutex::new(rx)),
            depth,
        },
    )
}

#[derive(Debug, Clone)]
pub struct SignalSender {
    tx: Tx,
    depth: Arc<AtomicUsize>,
    capacity: Option<usize>,
}

impl SignalSender {
    /// Enqueue without waiting.
    pub fn push(&self, signal: Signal) -> Result<(), PurgecastError> {
        // Count before sending so a fast consumer never decrements below zero.
        self.depth.fetch_add(1, Ordering::Relaxed);

        let result = match &self.tx {
            Tx::Bounded(tx) => tx.try_send(signal).map_err(|e| match e {
                mpsc::error::TrySendError::Full(s) => PurgecastError::QueueFull {
                    capacity: self.capacity.unwrap_or_default(),
                    endpoint: s.request.upstream().to_string(),
                },
                mpsc::error::TrySendError::Closed(s) => PurgecastError::QueueClosed {
                    endpoint: s.request.upstream().to_string(),
                },
            }),
            Tx::Unbounded(tx) => tx.send(signal).map_err(|e| PurgecastError::QueueClosed {
                endpoint: e.0.request.upstream().to_string(),
            }),
        };

        if result.is_err() {
            self.depth.fetch_sub(1, Ordering::Relaxed);
        }
        result
    }

    /// Approximate number of queued signals.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    #[must_use]
    pub const fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

#[derive(Debug, Clone)]
pub struct SignalReceiver {
    rx: Arc<Mutex<Rx>>,
    depth: Arc<AtomicUsize>,
}

impl SignalReceiver {
    /// Wait for the next signal. Returns `None` once every sender is gone
    /// and the queue is drained.
    pub async fn pop(&self) -> Option<Signal> {
        let signal = self.rx.lock().await.recv().await;
        if signal.is_some() {
            self.depth.fetch_sub(1, Ordering::Relaxed);
        }
        signal
    }

    /// Non-blocking pop, mainly for inspection in tests.
    pub fn try_pop(&self) -> Option<Signal> {
        let mut rx = self.rx.try_lock().ok()?;
        let signal = match &mut *rx {
            Rx::Bounded(rx) => rx.try_recv().ok(),
            Rx::Unbounded(rx) => rx.try_recv().ok(),
        };
        if signal.is_some() {
            self.depth.fetch_sub(1, Ordering::Relaxed);
        }
        signal
    }
}
