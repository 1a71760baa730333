//! Lifecycle tests for the reusable daemon.
//!
//! These verify the concurrency protocol end to end under virtual time:
//! - a single factory call no matter how many consumers race on first use
//! - reuse across a zero-user gap shorter than the quiet period
//! - a fresh generation (and exactly one teardown) after a longer gap
//! - terminal teardown and enter rejection once the root token cancels
//! - a loud failure on double exit

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reusable_containers::daemon::{
    factory_fn, BoxError, CreateResourceFn, Resource, ReusableDaemon,
};
use tokio_util::sync::CancellationToken;

// =============================================================================
// Test helpers
// =============================================================================

/// A resource that counts its teardowns into a shared tally.
struct MockTerminator {
    terminated: Arc<AtomicUsize>,
}

#[async_trait]
impl Resource for MockTerminator {
    async fn terminate(&self) -> Result<(), BoxError> {
        self.terminated.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A factory producing one [`MockTerminator`] per generation, counting
/// creations and teardowns across all generations.
fn counting_factory() -> (Arc<AtomicUsize>, Arc<AtomicUsize>, CreateResourceFn) {
    let created = Arc::new(AtomicUsize::new(0));
    let terminated = Arc::new(AtomicUsize::new(0));

    let factory_created = Arc::clone(&created);
    let factory_terminated = Arc::clone(&terminated);
    let factory = factory_fn(move |_cancel| {
        let created = Arc::clone(&factory_created);
        let terminated = Arc::clone(&factory_terminated);
        async move {
            created.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(MockTerminator { terminated }) as Arc<dyn Resource>)
        }
    });

    (created, terminated, factory)
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_zero_user_gap_reuses_the_resource() {
    let (created, terminated, factory) = counting_factory();
    let daemon =
        ReusableDaemon::start(CancellationToken::new(), Duration::from_secs(1), factory);

    let first = daemon.enter(CancellationToken::new()).await.unwrap();

    // The exit opens the quiet-period window and blocks until it resolves.
    let exiting = daemon.clone();
    let pending_exit = tokio::spawn(async move { exiting.exit().await });

    // Half the quiet period later a second consumer arrives.
    tokio::time::sleep(Duration::from_millis(500)).await;
    let second = daemon.enter(CancellationToken::new()).await.unwrap();

    assert!(
        Arc::ptr_eq(&first, &second),
        "the second consumer must observe the same generation"
    );
    assert_eq!(created.load(Ordering::SeqCst), 1);
    pending_exit.await.unwrap();

    daemon.exit().await;
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(terminated.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_thundering_herd_pays_one_creation() {
    const CONSUMERS: u64 = 1000;

    let (created, terminated, factory) = counting_factory();

    // A deliberately slow factory: every queued consumer waits behind the
    // single creation.
    let slow_factory: CreateResourceFn = Box::new(move |cancel| {
        let inner = factory(cancel);
        Box::pin(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            inner.await
        })
    });

    let daemon = ReusableDaemon::start(
        CancellationToken::new(),
        Duration::from_secs(1),
        slow_factory,
    );

    let mut consumers = Vec::new();
    for i in 0..CONSUMERS {
        let daemon = daemon.clone();
        consumers.push(tokio::spawn(async move {
            let resource = daemon.enter(CancellationToken::new()).await.unwrap();
            tokio::time::sleep(Duration::from_millis((i * 37) % 1000)).await;
            daemon.exit().await;
            resource
        }));
    }

    let mut resources = Vec::new();
    for consumer in consumers {
        resources.push(consumer.await.unwrap());
    }

    assert_eq!(created.load(Ordering::SeqCst), 1);
    for resource in &resources {
        assert!(Arc::ptr_eq(&resources[0], resource));
    }

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(terminated.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_idle_longer_than_quiet_period_refreshes() {
    let (created, terminated, factory) = counting_factory();
    let daemon = ReusableDaemon::start(
        CancellationToken::new(),
        Duration::from_millis(100),
        factory,
    );

    let first = daemon.enter(CancellationToken::new()).await.unwrap();
    daemon.exit().await;

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(terminated.load(Ordering::SeqCst), 1, "old generation gone");

    let second = daemon.enter(CancellationToken::new()).await.unwrap();
    assert!(
        !Arc::ptr_eq(&first, &second),
        "a fresh generation must be created after the quiet period"
    );
    assert_eq!(created.load(Ordering::SeqCst), 2);

    daemon.exit().await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(terminated.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_root_cancellation_is_terminal() {
    let (created, terminated, factory) = counting_factory();
    let root = CancellationToken::new();
    let daemon = ReusableDaemon::start(root.clone(), Duration::from_secs(1), factory);

    daemon.enter(CancellationToken::new()).await.unwrap();

    root.cancel();
    daemon.done().await;
    assert_eq!(terminated.load(Ordering::SeqCst), 1);

    let error = match daemon.enter(CancellationToken::new()).await {
        Ok(_) => panic!("enter after root cancellation must fail"),
        Err(error) => error,
    };
    assert!(error.to_string().contains("root context is done"));
    assert_eq!(created.load(Ordering::SeqCst), 1, "no resurrection");

    // The consumer that was still inside returns as soon as the terminal
    // teardown is observable.
    daemon.exit().await;
    assert_eq!(terminated.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_root_cancellation_closes_the_quiet_window() {
    let (_created, terminated, factory) = counting_factory();
    let root = CancellationToken::new();
    let daemon = ReusableDaemon::start(root.clone(), Duration::from_secs(60), factory);

    daemon.enter(CancellationToken::new()).await.unwrap();
    let exiting = daemon.clone();
    let pending_exit = tokio::spawn(async move { exiting.exit().await });

    tokio::time::sleep(Duration::from_millis(1)).await;
    root.cancel();

    pending_exit.await.unwrap();
    daemon.done().await;
    assert_eq!(terminated.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
#[should_panic(expected = "exit called more times than enter")]
async fn test_double_exit_fails_loudly() {
    let (_created, _terminated, factory) = counting_factory();
    let daemon =
        ReusableDaemon::start(CancellationToken::new(), Duration::from_millis(10), factory);

    daemon.enter(CancellationToken::new()).await.unwrap();
    daemon.exit().await;
    daemon.exit().await;
}
