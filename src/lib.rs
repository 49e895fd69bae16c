//! In-process webhook notification dispatch.
//!
//! This crate implements the delivery side of a webhook system: deciding
//! which registered subscriptions apply to a notification, building a
//! signed HTTP callback per subscriber, and classifying the outcome,
//! all without blocking the caller that raised the notification.
//!
//! ## Guarantees
//! - Producers never wait on delivery
//! - One signed attempt per (notification, subscription) work item
//! - A failed delivery never aborts delivery to other subscribers
//! - A failed delivery never terminates the worker loop
//!
//! ## Non-Guarantees
//! - Exactly-once delivery
//! - Ordering across subscribers
//! - Queue durability across restarts
//! - Internal retries (replay is an external concern)
//!
//! Subscription persistence, management APIs, and secret storage live
//! outside this crate behind the [`SubscriptionStore`] trait.

mod error;
mod matcher;
mod processor;
mod queue;
mod sender;
mod signing;
mod store;
mod types;
mod worker;

pub use error::{DeliveryOutcome, DispatchError, FailureReason};
pub use matcher::matches;
pub use processor::NotificationProcessor;
pub use queue::{DispatchQueue, QueueConfig};
pub use sender::{
    DeliveryHooks,
    NoopHooks,
    PauseOnNotFound,
    Sender,
    SenderConfig,
    HEADER_DELIVERY_ID,
    HEADER_SIGNATURE,
    HEADER_TIMESTAMP,
    HEADER_TRIGGER_ID,
    TRIGGER_ID_FIELD,
};
pub use signing::{sign, verify_signature, SECRET_LENGTH};
pub use store::{InMemorySubscriptionStore, SubscriptionStore};
pub use types::{Filter, Notification, OverflowPolicy, Subscription, SubscriptionId, WorkItem};
pub use worker::{
    DeliveryHandler,
    DeliveryHandlerFactory,
    DispatchWorker,
    SendHandler,
    SendHandlerFactory,
};
