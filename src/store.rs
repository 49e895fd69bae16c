use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::DispatchError;
use crate::matcher;
use crate::types::{Notification, Subscription, SubscriptionId};

/// The registration subsystem, as seen from the dispatch pipeline.
///
/// `get_applicable` is expected to have excluded paused subscriptions
/// and irrelevant triggers; the matcher refines the rest in memory.
/// `pause` is the narrow write-back contract used when a target answers
/// 404/410. Storage internals (persistence, secret encryption) are the
/// implementor's concern.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn get_applicable(
        &self,
        notification: &Notification,
    ) -> Result<Vec<Subscription>, DispatchError>;

    async fn pause(&self, id: &SubscriptionId) -> Result<(), DispatchError>;
}

/// In-memory store for embedding and tests.
#[derive(Default)]
pub struct InMemorySubscriptionStore {
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, subscription: Subscription) {
        self.subscriptions
            .write()
            .expect("store lock poisoned")
            .insert(subscription.id.clone(), subscription);
    }

    pub fn get(&self, id: &SubscriptionId) -> Option<Subscription> {
        self.subscriptions
            .read()
            .expect("store lock poisoned")
            .get(id)
            .cloned()
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn get_applicable(
        &self,
        notification: &Notification,
    ) -> Result<Vec<Subscription>, DispatchError> {
        let guard = self.subscriptions.read().expect("store lock poisoned");
        Ok(guard
            .values()
            .filter(|sub| !sub.paused && matcher::matches(sub, notification))
            .cloned()
            .collect())
    }

    async fn pause(&self, id: &SubscriptionId) -> Result<(), DispatchError> {
        let mut guard = self.subscriptions.write().expect("store lock poisoned");
        match guard.get_mut(id) {
            Some(subscription) => {
                subscription.paused = true;
                Ok(())
            }
            None => Err(DispatchError::Store(format!(
                "unknown subscription: {}",
                id.0
            ))),
        }
    }
}
