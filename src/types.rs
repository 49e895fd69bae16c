use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// One application event instance.
///
/// A `Notification` is immutable once created. The payload is a
/// string-keyed tree of JSON values; the matcher walks it structurally,
/// so callers normalize their domain objects into it once at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Opaque identifier for the event type (e.g. `"order.shipped"`).
    pub trigger_id: String,

    /// Structured event payload.
    pub payload: Map<String, Value>,
}

impl Notification {
    /// Create a notification with an empty payload.
    pub fn new(trigger_id: impl Into<String>) -> Self {
        Self {
            trigger_id: trigger_id.into(),
            payload: Map::new(),
        }
    }

    /// Create a notification with the given payload.
    pub fn with_payload(trigger_id: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            trigger_id: trigger_id.into(),
            payload,
        }
    }

    /// Add a payload entry.
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }
}

/// Unique identifier for a subscription.
///
/// This is a strongly-typed wrapper to avoid accidental mixing
/// of subscription IDs with other string identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub String);

/// A registered callback target.
///
/// Owned by the registration subsystem; the dispatch pipeline treats it
/// as read-only input. The one write that crosses back is a pause
/// request raised from not-found handling, see
/// [`SubscriptionStore::pause`](crate::SubscriptionStore::pause).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Logical identifier for the subscription.
    pub id: SubscriptionId,

    /// Absolute http/https callback URI.
    pub callback_uri: String,

    /// Shared secret used as the HMAC key. Must be exactly
    /// [`SECRET_LENGTH`](crate::SECRET_LENGTH) characters.
    pub secret: String,

    /// Filter clauses; OR semantics across clauses.
    ///
    /// Registration rejects subscriptions with zero filters, but an
    /// already-stored subscription with an empty list matches every
    /// notification. The two policies belong to different components
    /// and are intentionally not unified.
    pub filters: Vec<Filter>,

    /// Paused subscriptions are excluded from delivery candidates.
    pub paused: bool,
}

impl Subscription {
    pub fn new(
        id: impl Into<String>,
        callback_uri: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            id: SubscriptionId(id.into()),
            callback_uri: callback_uri.into(),
            secret: secret.into(),
            filters: Vec::new(),
            paused: false,
        }
    }

    /// Add a filter clause.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_paused(mut self, paused: bool) -> Self {
        self.paused = paused;
        self
    }
}

/// One clause on a subscription: a trigger plus parameter constraints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filter {
    /// Matched against [`Notification::trigger_id`] by exact equality.
    pub trigger: String,

    /// Dotted-path key to expected value. Empty means "match the
    /// trigger with no further constraint".
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
}

impl Filter {
    pub fn new(trigger: impl Into<String>) -> Self {
        Self {
            trigger: trigger.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// Add a parameter constraint. The key may be a dotted path
    /// addressing nested payload values.
    pub fn with_parameter(mut self, key: impl Into<String>, expected: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), expected.into());
        self
    }
}

/// The unit of asynchronous delivery work: one notification bound to
/// one target subscription.
///
/// Created at match time, consumed exactly once by the worker loop,
/// discarded after the delivery attempt. Per-subscriber items keep one
/// subscriber's failure isolated from the others.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub notification: Notification,
    pub subscription: Subscription,
}

impl WorkItem {
    pub fn new(notification: Notification, subscription: Subscription) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            notification,
            subscription,
        }
    }
}

/// What `enqueue` does when a bounded queue is full.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Reject new work when the queue is full.
    Reject,
    /// Best-effort drop of the oldest queued item.
    DropOldest,
}
