use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use hook_relay::{
    DispatchError, DispatchQueue, Notification, OverflowPolicy, QueueConfig, Subscription,
    WorkItem,
};

fn item(tag: &str) -> WorkItem {
    WorkItem::new(
        Notification::new(tag),
        Subscription::new("sub-1", "https://example.com/hook", "s".repeat(64)),
    )
}

#[tokio::test]
async fn enqueue_dequeue_round_trip() {
    let queue = DispatchQueue::new();
    let token = CancellationToken::new();

    let original = item("noun.verb");
    let id = original.id;
    queue.enqueue(original).unwrap();

    let dequeued = queue.dequeue(&token).await.unwrap();
    assert_eq!(dequeued.id, id);
    assert_eq!(dequeued.notification.trigger_id, "noun.verb");
}

#[tokio::test]
async fn dequeue_is_fifo() {
    let queue = DispatchQueue::new();
    let token = CancellationToken::new();

    queue.enqueue(item("first")).unwrap();
    queue.enqueue(item("second")).unwrap();
    queue.enqueue(item("third")).unwrap();

    for expected in ["first", "second", "third"] {
        let dequeued = queue.dequeue(&token).await.unwrap();
        assert_eq!(dequeued.notification.trigger_id, expected);
    }
}

#[tokio::test]
async fn dequeue_waits_for_enqueue() {
    let queue = Arc::new(DispatchQueue::new());
    let token = CancellationToken::new();

    let consumer = {
        let queue = queue.clone();
        let token = token.clone();
        tokio::spawn(async move { queue.dequeue(&token).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!consumer.is_finished());

    queue.enqueue(item("late")).unwrap();
    let dequeued = consumer.await.unwrap().unwrap();
    assert_eq!(dequeued.notification.trigger_id, "late");
}

#[tokio::test]
async fn cancellation_unblocks_empty_dequeue() {
    let queue = Arc::new(DispatchQueue::new());
    let token = CancellationToken::new();

    let consumer = {
        let queue = queue.clone();
        let token = token.clone();
        tokio::spawn(async move { queue.dequeue(&token).await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    token.cancel();

    assert!(consumer.await.unwrap().is_none());
}

#[tokio::test]
async fn enqueue_after_close_is_rejected() {
    let queue = DispatchQueue::new();
    queue.close();

    let err = queue.enqueue(item("too.late")).unwrap_err();
    assert!(matches!(err, DispatchError::QueueClosed));
}

#[tokio::test]
async fn bounded_queue_rejects_overflow() {
    let queue = DispatchQueue::with_config(QueueConfig {
        capacity: Some(2),
        overflow_policy: OverflowPolicy::Reject,
    });

    queue.enqueue(item("a")).unwrap();
    queue.enqueue(item("b")).unwrap();
    let err = queue.enqueue(item("c")).unwrap_err();
    assert!(matches!(err, DispatchError::Backpressure));
    assert_eq!(queue.len(), 2);
}

#[tokio::test]
async fn bounded_queue_drops_oldest() {
    let queue = DispatchQueue::with_config(QueueConfig {
        capacity: Some(2),
        overflow_policy: OverflowPolicy::DropOldest,
    });
    let token = CancellationToken::new();

    queue.enqueue(item("a")).unwrap();
    queue.enqueue(item("b")).unwrap();
    queue.enqueue(item("c")).unwrap();

    assert_eq!(queue.len(), 2);
    let first = queue.dequeue(&token).await.unwrap();
    assert_eq!(first.notification.trigger_id, "b");
}

#[tokio::test]
async fn concurrent_producers_lose_nothing() {
    let queue = Arc::new(DispatchQueue::new());
    let token = CancellationToken::new();

    let producers: Vec<_> = (0..8)
        .map(|p| {
            let queue = queue.clone();
            tokio::spawn(async move {
                for i in 0..25 {
                    queue.enqueue(item(&format!("p{p}.i{i}"))).unwrap();
                }
            })
        })
        .collect();

    for producer in producers {
        producer.await.unwrap();
    }

    let mut seen = 0;
    while queue.dequeue(&token).await.is_some() {
        seen += 1;
        if seen == 200 {
            break;
        }
    }
    assert_eq!(seen, 200);
    assert!(queue.is_empty());
}
