//! Behavioural tests for screen-scoped live subscriptions against the
//! in-memory backend.

#![expect(
    clippy::expect_used,
    reason = "test code uses expect for clear failure messages"
)]

use std::sync::Arc;
use std::time::Duration;

use gather::domain::ports::{FeedTopic, LiveFeed};
use gather::domain::{
    Cancelled, ChatService, ErrorCode, EventId, Session, SubscriptionScope, UserId,
};
use gather::outbound::memory::{FailPoint, InMemoryBackend};
use mockable::DefaultClock;
use rstest::{fixture, rstest};
use tokio::time::timeout;

const SEED: &str = include_str!("../fixtures/seed.json");

#[fixture]
fn backend() -> Arc<InMemoryBackend> {
    Arc::new(InMemoryBackend::from_json(SEED).expect("seed parses"))
}

fn park() -> EventId {
    EventId::new("evt-park").expect("valid id")
}

#[rstest]
#[tokio::test]
async fn chat_write_wakes_the_screen(backend: Arc<InMemoryBackend>) {
    let feed: Arc<dyn LiveFeed> = backend.clone();
    let mut scope = SubscriptionScope::new();
    scope
        .subscribe(Arc::clone(&feed), FeedTopic::Chat(park()))
        .await
        .expect("chat subscription");
    scope
        .subscribe(feed, FeedTopic::Contributions(park()))
        .await
        .expect("contribution subscription");
    assert_eq!(backend.active_subscriptions(), 2);

    let chat = ChatService::new(
        Arc::clone(&backend),
        Arc::clone(&backend),
        Arc::new(DefaultClock),
    );
    let session = Session::new(UserId::new("uid-ada").expect("valid id"));
    chat.send(Some(&session), &park(), "hello")
        .await
        .expect("message sent");

    let change = timeout(Duration::from_secs(1), scope.next_change())
        .await
        .expect("change arrives");
    assert_eq!(change, Some(FeedTopic::Chat(park())));

    scope.teardown();
    assert_eq!(backend.active_subscriptions(), 0);
    assert_eq!(scope.next_change().await, None);
}

#[rstest]
#[tokio::test]
async fn dropping_the_scope_releases_listeners(backend: Arc<InMemoryBackend>) {
    {
        let mut scope = SubscriptionScope::new();
        scope
            .subscribe(backend.clone(), FeedTopic::Events)
            .await
            .expect("events subscription");
        assert_eq!(backend.active_subscriptions(), 1);
    }
    assert_eq!(backend.active_subscriptions(), 0);
}

#[rstest]
#[tokio::test]
async fn teardown_cancels_outstanding_work(backend: Arc<InMemoryBackend>) {
    let mut scope = SubscriptionScope::new();
    let token = scope.token();
    let waiter = tokio::spawn(async move { token.cancelled().await });

    scope.teardown();

    timeout(Duration::from_secs(1), waiter)
        .await
        .expect("spawned work observes teardown")
        .expect("task joins");
    assert_eq!(scope.run(async { 1 }).await, Err(Cancelled));
    let err = scope
        .subscribe(backend, FeedTopic::Events)
        .await
        .expect_err("scope closed");
    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn rejected_subscription_leaves_nothing_open(backend: Arc<InMemoryBackend>) {
    let mut scope = SubscriptionScope::new();
    backend.fail_next(FailPoint::Subscribe);

    let err = scope
        .subscribe(backend.clone(), FeedTopic::Events)
        .await
        .expect_err("subscribe fails");

    assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
    assert!(scope.is_empty());
    assert_eq!(backend.active_subscriptions(), 0);
}

#[rstest]
#[tokio::test]
async fn leaving_the_screen_cancels_a_pending_load(backend: Arc<InMemoryBackend>) {
    let mut scope = SubscriptionScope::new();
    scope
        .subscribe(backend.clone(), FeedTopic::Events)
        .await
        .expect("events subscription");
    let leave = scope.teardown_handle();

    let slow_load = tokio::time::sleep(Duration::from_secs(30));
    let (loaded, ()) = tokio::join!(scope.run(slow_load), async move {
        tokio::task::yield_now().await;
        leave.cancel();
    });

    assert_eq!(loaded, Err(Cancelled));
    assert_eq!(scope.next_change().await, None);
    assert_eq!(backend.active_subscriptions(), 0);
}
