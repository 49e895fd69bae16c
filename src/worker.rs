use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{DeliveryOutcome, DispatchError};
use crate::queue::DispatchQueue;
use crate::sender::Sender;
use crate::types::WorkItem;

/// Consumes one work item: a single delivery attempt.
#[async_trait]
pub trait DeliveryHandler: Send + Sync {
    async fn handle(
        &self,
        item: WorkItem,
        token: &CancellationToken,
    ) -> Result<DeliveryOutcome, DispatchError>;
}

/// Produces a fresh handler per work item.
///
/// Handler lifetime is per-item, not shared across items, so state
/// accumulated for one delivery cannot leak into the next. Shared
/// resources (the HTTP client) live behind `Arc` inside the factory.
pub trait DeliveryHandlerFactory: Send + Sync {
    fn create(&self) -> Box<dyn DeliveryHandler>;
}

/// Default handler: hand the item to a [`Sender`].
pub struct SendHandler {
    sender: Arc<Sender>,
}

impl SendHandler {
    pub fn new(sender: Arc<Sender>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl DeliveryHandler for SendHandler {
    async fn handle(
        &self,
        item: WorkItem,
        token: &CancellationToken,
    ) -> Result<DeliveryOutcome, DispatchError> {
        self.sender
            .send(&item.notification, &item.subscription, token)
            .await
    }
}

/// Factory for [`SendHandler`]; the sender (and its HTTP client) is
/// shared, the handler instance is not.
pub struct SendHandlerFactory {
    sender: Arc<Sender>,
}

impl SendHandlerFactory {
    pub fn new(sender: Arc<Sender>) -> Self {
        Self { sender }
    }
}

impl DeliveryHandlerFactory for SendHandlerFactory {
    fn create(&self) -> Box<dyn DeliveryHandler> {
        Box::new(SendHandler::new(self.sender.clone()))
    }
}

/// A long-lived background task consuming the dispatch queue.
///
/// The loop runs until its token is cancelled. A handler error is
/// logged and the loop continues; one failed delivery never terminates
/// the worker. On shutdown the in-flight item observes the same token,
/// and items still queued are dropped.
pub struct DispatchWorker {
    queue: Arc<DispatchQueue>,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl DispatchWorker {
    /// Spawn the worker loop on the current tokio runtime.
    pub fn spawn(queue: Arc<DispatchQueue>, factory: Arc<dyn DeliveryHandlerFactory>) -> Self {
        let token = CancellationToken::new();
        let handle = tokio::spawn(worker_loop(queue.clone(), factory, token.clone()));
        Self {
            queue,
            token,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Stop the loop. The in-flight item is cancelled cooperatively;
    /// pending items are dropped.
    pub async fn shutdown(&mut self) {
        self.token.cancel();
        self.queue.close();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

async fn worker_loop(
    queue: Arc<DispatchQueue>,
    factory: Arc<dyn DeliveryHandlerFactory>,
    token: CancellationToken,
) {
    tracing::debug!("dispatch worker started");

    while let Some(item) = queue.dequeue(&token).await {
        let handler = factory.create();
        let item_id = item.id;
        match handler.handle(item, &token).await {
            Ok(outcome) => {
                tracing::debug!(%item_id, ?outcome, "work item processed");
            }
            Err(err) => {
                // The loop must survive any single failed delivery.
                tracing::error!(%item_id, error = %err, "delivery handler failed");
            }
        }
    }

    tracing::debug!("dispatch worker stopped");
}
