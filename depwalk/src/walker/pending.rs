use std::pin::pin;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;
use tracing::error;

/// Counter of tasks which were created but are not fully processed yet.
///
/// The counter starts at one, accounting for the root task. A worker increments it for every
/// child before enqueuing the child, and decrements it exactly once after finishing a task.
/// Because children are always counted before their parent is discounted, reaching zero means
/// that no task is queued or in flight, and none can ever appear again.
#[derive(Debug)]
pub struct PendingWork {
    count: AtomicUsize,
    drained: Notify,
}

impl PendingWork {
    pub fn new(initial: usize) -> Self {
        Self {
            count: AtomicUsize::new(initial),
            drained: Notify::new(),
        }
    }

    pub fn get(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn increment(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    /// Marks one task as finished and returns the number of tasks still pending.
    pub fn decrement(&self) -> usize {
        let previous = self
            .count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                count.checked_sub(1)
            });
        match previous {
            Ok(1) => {
                self.drained.notify_waiters();
                0
            }
            Ok(previous) => previous - 1,
            Err(_) => {
                error!("pending work counter decremented below zero");
                0
            }
        }
    }

    /// Waits until the counter reaches zero.
    pub async fn drained(&self) {
        loop {
            let mut notified = pin!(self.drained.notified());
            // Register interest before checking the counter, so a notification sent in between
            // is not lost.
            notified.as_mut().enable();
            if self.get() == 0 {
                return;
            }
            notified.await;
        }
    }
}
