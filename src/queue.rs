use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::error::DispatchError;
use crate::types::{OverflowPolicy, WorkItem};

#[cfg(feature = "metrics")]
fn metric_inc(name: &'static str) {
    metrics::counter!(name).increment(1);
}

#[cfg(not(feature = "metrics"))]
fn metric_inc(_name: &'static str) {}

#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// `None` means unbounded: enqueue never blocks and never rejects.
    /// Backpressure is a deliberate non-goal of the default setup.
    pub capacity: Option<usize>,

    /// Applied only when `capacity` is set.
    pub overflow_policy: OverflowPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: None,
            overflow_policy: OverflowPolicy::Reject,
        }
    }
}

/// FIFO hand-off between notification producers and the delivery worker.
///
/// Many producers may enqueue concurrently; `enqueue` never suspends.
/// The worker suspends in [`dequeue`](Self::dequeue) until an item
/// arrives, the queue closes, or the token is cancelled. Items still
/// queued at shutdown are dropped; durability is out of scope.
pub struct DispatchQueue {
    items: Mutex<VecDeque<WorkItem>>,
    notify: Notify,
    closed: AtomicBool,
    config: QueueConfig,
}

impl DispatchQueue {
    pub fn new() -> Self {
        Self::with_config(QueueConfig::default())
    }

    pub fn with_config(config: QueueConfig) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
            config,
        }
    }

    /// Append an item and wake one waiting consumer. Never blocks the
    /// producer.
    pub fn enqueue(&self, item: WorkItem) -> Result<(), DispatchError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DispatchError::QueueClosed);
        }

        {
            let mut items = self.items.lock().expect("queue lock poisoned");
            if let Some(capacity) = self.config.capacity {
                if items.len() >= capacity {
                    match self.config.overflow_policy {
                        OverflowPolicy::Reject => {
                            metric_inc("webhook.queue.rejected");
                            return Err(DispatchError::Backpressure);
                        }
                        OverflowPolicy::DropOldest => {
                            items.pop_front();
                            metric_inc("webhook.queue.dropped_oldest");
                        }
                    }
                }
            }
            items.push_back(item);
        }

        metric_inc("webhook.queue.enqueued");
        self.notify.notify_one();
        Ok(())
    }

    /// Remove and return the oldest item, suspending while the queue is
    /// empty. Returns `None` once the token is cancelled or the queue
    /// is closed and drained.
    pub async fn dequeue(&self, token: &CancellationToken) -> Option<WorkItem> {
        loop {
            if token.is_cancelled() {
                return None;
            }

            {
                let mut items = self.items.lock().expect("queue lock poisoned");
                if let Some(item) = items.pop_front() {
                    // Hand the baton so the contract stays correct with
                    // more than one consumer.
                    if !items.is_empty() {
                        self.notify.notify_one();
                    }
                    return Some(item);
                }
            }

            if self.closed.load(Ordering::SeqCst) {
                return None;
            }

            tokio::select! {
                _ = token.cancelled() => return None,
                _ = self.notify.notified() => {}
            }
        }
    }

    /// Stop accepting work. Waiting consumers are woken; items already
    /// queued may still be dequeued until the queue drains.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.items.lock().expect("queue lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DispatchQueue {
    fn default() -> Self {
        Self::new()
    }
}
