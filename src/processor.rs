use std::sync::Arc;

use crate::error::DispatchError;
use crate::matcher;
use crate::queue::DispatchQueue;
use crate::store::SubscriptionStore;
use crate::types::{Notification, WorkItem};

#[cfg(feature = "metrics")]
fn metric_inc(name: &'static str) {
    metrics::counter!(name).increment(1);
}

#[cfg(not(feature = "metrics"))]
fn metric_inc(_name: &'static str) {}

/// Entry point of the pipeline: notification in, work items out.
///
/// Asks the store for candidate subscriptions, refines them through the
/// matcher, and enqueues one per-subscriber [`WorkItem`]. The caller
/// returns as soon as the items are queued; delivery latency never
/// reaches the producer.
pub struct NotificationProcessor {
    store: Arc<dyn SubscriptionStore>,
    queue: Arc<DispatchQueue>,
}

impl NotificationProcessor {
    pub fn new(store: Arc<dyn SubscriptionStore>, queue: Arc<DispatchQueue>) -> Self {
        Self { store, queue }
    }

    /// Returns the number of work items queued for this notification.
    pub async fn process(&self, notification: Notification) -> Result<usize, DispatchError> {
        let candidates = self.store.get_applicable(&notification).await?;

        let mut queued = 0;
        for subscription in candidates {
            if subscription.paused {
                continue;
            }
            if !matcher::matches(&subscription, &notification) {
                continue;
            }

            self.queue
                .enqueue(WorkItem::new(notification.clone(), subscription))?;
            queued += 1;
        }

        if queued > 0 {
            metric_inc("webhook.dispatch.enqueued");
        }
        tracing::debug!(
            trigger_id = %notification.trigger_id,
            queued,
            "notification processed"
        );
        Ok(queued)
    }
}
