//! End-to-end: notification in, signed HTTP callback out.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hook_relay::{
    DispatchQueue, DispatchWorker, Filter, InMemorySubscriptionStore, Notification,
    NotificationProcessor, SendHandlerFactory, Sender, SenderConfig, Subscription,
    HEADER_TRIGGER_ID,
};

fn secret() -> String {
    "0123456789abcdef".repeat(4)
}

struct Pipeline {
    store: Arc<InMemorySubscriptionStore>,
    processor: NotificationProcessor,
    worker: DispatchWorker,
}

fn build_pipeline() -> Pipeline {
    let store = Arc::new(InMemorySubscriptionStore::new());
    let queue = Arc::new(DispatchQueue::new());
    let sender = Arc::new(Sender::new(SenderConfig {
        timeout: Duration::from_millis(500),
    }));

    let processor = NotificationProcessor::new(store.clone(), queue.clone());
    let worker = DispatchWorker::spawn(queue, Arc::new(SendHandlerFactory::new(sender)));

    Pipeline {
        store,
        processor,
        worker,
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(200)).await;
}

#[tokio::test]
async fn matched_notification_becomes_one_signed_post() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(header(HEADER_TRIGGER_ID, "noun.verb"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut pipeline = build_pipeline();
    pipeline.store.insert(
        Subscription::new("sub-1", format!("{}/hook", server.uri()), secret())
            .with_filter(Filter::new("noun.verb")),
    );

    let notification = Notification::new("noun.verb").with_entry("k", "v");
    let queued = pipeline.processor.process(notification).await.unwrap();
    assert_eq!(queued, 1);

    settle().await;
    pipeline.worker.shutdown().await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["triggerId"], json!("noun.verb"));
    assert_eq!(body["k"], json!("v"));
}

#[tokio::test]
async fn unmatched_subscription_receives_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut pipeline = build_pipeline();
    pipeline.store.insert(
        Subscription::new("sub-1", format!("{}/hook", server.uri()), secret())
            .with_filter(Filter::new("other.trigger")),
    );

    let queued = pipeline
        .processor
        .process(Notification::new("noun.verb"))
        .await
        .unwrap();
    assert_eq!(queued, 0);

    settle().await;
    pipeline.worker.shutdown().await;
}

#[tokio::test]
async fn parameter_filters_select_subscribers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/nl"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/de"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut pipeline = build_pipeline();
    pipeline.store.insert(
        Subscription::new("sub-nl", format!("{}/nl", server.uri()), secret()).with_filter(
            Filter::new("order.shipped").with_parameter("address.country", "NL"),
        ),
    );
    pipeline.store.insert(
        Subscription::new("sub-de", format!("{}/de", server.uri()), secret()).with_filter(
            Filter::new("order.shipped").with_parameter("address.country", "DE"),
        ),
    );

    let notification = Notification::new("order.shipped")
        .with_entry("address", json!({"country": "nl", "city": "Utrecht"}));
    let queued = pipeline.processor.process(notification).await.unwrap();
    assert_eq!(queued, 1);

    settle().await;
    pipeline.worker.shutdown().await;
}

#[tokio::test]
async fn paused_subscription_is_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut pipeline = build_pipeline();
    pipeline.store.insert(
        Subscription::new("sub-1", format!("{}/hook", server.uri()), secret())
            .with_filter(Filter::new("noun.verb"))
            .with_paused(true),
    );

    let queued = pipeline
        .processor
        .process(Notification::new("noun.verb"))
        .await
        .unwrap();
    assert_eq!(queued, 0);

    settle().await;
    pipeline.worker.shutdown().await;
}

#[tokio::test]
async fn each_matched_subscriber_gets_its_own_delivery() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut pipeline = build_pipeline();
    pipeline.store.insert(
        Subscription::new("sub-a", format!("{}/a", server.uri()), secret())
            .with_filter(Filter::new("noun.verb")),
    );
    pipeline.store.insert(
        Subscription::new("sub-b", format!("{}/b", server.uri()), secret())
            .with_filter(Filter::new("noun.verb")),
    );

    let queued = pipeline
        .processor
        .process(Notification::new("noun.verb"))
        .await
        .unwrap();
    assert_eq!(queued, 2);

    settle().await;
    pipeline.worker.shutdown().await;
}
