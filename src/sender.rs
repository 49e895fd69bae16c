use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{DeliveryOutcome, DispatchError, FailureReason};
use crate::signing::sign;
use crate::store::SubscriptionStore;
use crate::types::{Notification, Subscription};

#[cfg(feature = "metrics")]
fn metric_inc(name: &'static str) {
    metrics::counter!(name).increment(1);
}

#[cfg(not(feature = "metrics"))]
fn metric_inc(_name: &'static str) {}

/// Signature over the serialized body, lowercase hex.
pub const HEADER_SIGNATURE: &str = "x-webhook-signature";
/// The notification's trigger id.
pub const HEADER_TRIGGER_ID: &str = "x-webhook-trigger-id";
/// UTC send time, RFC1123.
pub const HEADER_TIMESTAMP: &str = "x-webhook-timestamp";
/// Fresh UUID per delivery attempt.
pub const HEADER_DELIVERY_ID: &str = "x-webhook-delivery-id";

/// Body field carrying the trigger id. A payload key with the same name
/// wins; the payload is never overwritten.
pub const TRIGGER_ID_FIELD: &str = "triggerId";

const RFC1123_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Outcome callbacks invoked by the [`Sender`] after each attempt.
///
/// All methods are no-ops by default. This is the extension point for
/// specialized delivery handling: persisting delivery logs, pausing
/// dead subscriptions, feeding a replay job.
#[async_trait]
pub trait DeliveryHooks: Send + Sync {
    /// Subscriber acknowledged with 2xx.
    async fn on_success(&self, _notification: &Notification, _subscription: &Subscription) {}

    /// Subscriber answered 404 or 410. This is the one path permitted
    /// to request that the store pause the subscription.
    async fn on_not_found(&self, _notification: &Notification, _subscription: &Subscription) {}

    /// Any other status, or a transport failure. `error` carries the
    /// transport error when one occurred.
    async fn on_failure(
        &self,
        _notification: &Notification,
        _subscription: &Subscription,
        _error: Option<&reqwest::Error>,
    ) {
    }
}

/// Default hooks: do nothing.
#[derive(Debug, Default)]
pub struct NoopHooks;

#[async_trait]
impl DeliveryHooks for NoopHooks {}

/// Hooks that ask the subscription store to pause a target that
/// answered 404/410.
pub struct PauseOnNotFound {
    store: Arc<dyn SubscriptionStore>,
}

impl PauseOnNotFound {
    pub fn new(store: Arc<dyn SubscriptionStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DeliveryHooks for PauseOnNotFound {
    async fn on_not_found(&self, _notification: &Notification, subscription: &Subscription) {
        if let Err(err) = self.store.pause(&subscription.id).await {
            tracing::warn!(
                subscription_id = %subscription.id.0,
                error = %err,
                "failed to pause gone subscription"
            );
        }
    }
}

#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Maximum time allowed for a single delivery attempt.
    pub timeout: Duration,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

/// Builds, signs, and sends one HTTP callback per subscriber, then
/// classifies the outcome.
///
/// The sender never retries; one invocation is one attempt. Transport
/// failures are routed to the hooks, never returned to the caller. The
/// inner `reqwest::Client` is shared and safe for concurrent use.
pub struct Sender {
    client: reqwest::Client,
    hooks: Arc<dyn DeliveryHooks>,
    config: SenderConfig,
}

impl Sender {
    pub fn new(config: SenderConfig) -> Self {
        Self::with_hooks(config, Arc::new(NoopHooks))
    }

    pub fn with_hooks(config: SenderConfig, hooks: Arc<dyn DeliveryHooks>) -> Self {
        Self {
            client: reqwest::Client::new(),
            hooks,
            config,
        }
    }

    /// Deliver `notification` to every subscriber concurrently and wait
    /// for all attempts to complete. No ordering between subscribers.
    ///
    /// An empty slice completes immediately: no HTTP call, no hooks.
    /// Errors raised before I/O (bad secret, unserializable body) land
    /// in that subscriber's slot of the returned vector and do not
    /// abort the other sends.
    pub async fn send_all(
        &self,
        notification: &Notification,
        subscriptions: &[Subscription],
        token: &CancellationToken,
    ) -> Vec<Result<DeliveryOutcome, DispatchError>> {
        join_all(
            subscriptions
                .iter()
                .map(|subscription| self.send(notification, subscription, token)),
        )
        .await
    }

    /// Deliver `notification` to a single subscriber.
    ///
    /// Returns `Err` only for caller errors caught before any network
    /// I/O (invalid secret, unserializable body). Every attempted
    /// delivery resolves to a [`DeliveryOutcome`] and exactly one hook.
    pub async fn send(
        &self,
        notification: &Notification,
        subscription: &Subscription,
        token: &CancellationToken,
    ) -> Result<DeliveryOutcome, DispatchError> {
        let body = build_body(notification);
        let content = serde_json::to_string(&body)?;
        let signature = sign(&subscription.secret, &content)?;

        let delivery_id = Uuid::new_v4();
        let timestamp = Utc::now().format(RFC1123_FORMAT).to_string();

        let request = self
            .client
            .post(&subscription.callback_uri)
            .timeout(self.config.timeout)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(HEADER_SIGNATURE, signature)
            .header(HEADER_TRIGGER_ID, &notification.trigger_id)
            .header(HEADER_TIMESTAMP, timestamp)
            .header(HEADER_DELIVERY_ID, delivery_id.to_string())
            .body(content);

        // Race the send against shutdown so no request outlives the
        // dispatcher. Only status and headers are awaited; response
        // bodies are never read.
        let response = tokio::select! {
            response = request.send() => response,
            _ = token.cancelled() => {
                tracing::debug!(
                    subscription_id = %subscription.id.0,
                    %delivery_id,
                    "delivery cancelled by shutdown"
                );
                self.hooks.on_failure(notification, subscription, None).await;
                return Ok(DeliveryOutcome::Failed(FailureReason::Cancelled));
            }
        };

        let outcome = match response {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    tracing::info!(
                        subscription_id = %subscription.id.0,
                        trigger_id = %notification.trigger_id,
                        %delivery_id,
                        status = status.as_u16(),
                        "webhook delivered"
                    );
                    metric_inc("webhook.delivery.success");
                    self.hooks.on_success(notification, subscription).await;
                    DeliveryOutcome::Delivered
                } else if status.as_u16() == 404 || status.as_u16() == 410 {
                    tracing::info!(
                        subscription_id = %subscription.id.0,
                        %delivery_id,
                        status = status.as_u16(),
                        "webhook target gone"
                    );
                    metric_inc("webhook.delivery.gone");
                    self.hooks.on_not_found(notification, subscription).await;
                    DeliveryOutcome::TargetGone
                } else {
                    tracing::error!(
                        subscription_id = %subscription.id.0,
                        trigger_id = %notification.trigger_id,
                        %delivery_id,
                        status = status.as_u16(),
                        "webhook delivery failed"
                    );
                    metric_inc("webhook.delivery.failure");
                    self.hooks.on_failure(notification, subscription, None).await;
                    DeliveryOutcome::Failed(FailureReason::Status(status.as_u16()))
                }
            }
            Err(err) => {
                let reason = if err.is_timeout() {
                    FailureReason::Timeout
                } else {
                    FailureReason::Network
                };
                tracing::error!(
                    subscription_id = %subscription.id.0,
                    trigger_id = %notification.trigger_id,
                    %delivery_id,
                    error = %err,
                    "webhook delivery failed"
                );
                metric_inc("webhook.delivery.failure");
                self.hooks
                    .on_failure(notification, subscription, Some(&err))
                    .await;
                DeliveryOutcome::Failed(reason)
            }
        };

        Ok(outcome)
    }
}

/// Merge the trigger id with the payload. The payload always wins a
/// key collision.
fn build_body(notification: &Notification) -> Value {
    let mut body = Map::with_capacity(notification.payload.len() + 1);
    body.insert(
        TRIGGER_ID_FIELD.to_string(),
        Value::String(notification.trigger_id.clone()),
    );
    for (key, value) in &notification.payload {
        body.insert(key.clone(), value.clone());
    }
    Value::Object(body)
}
