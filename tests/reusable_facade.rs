//! Tests for the typed `Reusable` facade.

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reusable_containers::daemon::{BoxError, Resource};
use reusable_containers::reusable::{Creator, Reusable, ReusableError};
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct FakeBroker {
    address: String,
}

#[async_trait]
impl Resource for FakeBroker {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

struct FakeBrokerCreator {
    created: Arc<AtomicUsize>,
}

#[async_trait]
impl Creator for FakeBrokerCreator {
    type Output = FakeBroker;

    async fn create(&self, _cancel: CancellationToken) -> Result<FakeBroker, BoxError> {
        let sequence = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(FakeBroker {
            address: format!("amqp://localhost:5672/{sequence}"),
        })
    }
}

fn broker_reusable() -> (Arc<AtomicUsize>, Reusable<FakeBrokerCreator>) {
    let created = Arc::new(AtomicUsize::new(0));
    let reusable = Reusable::with_quiet_period(
        FakeBrokerCreator {
            created: Arc::clone(&created),
        },
        Duration::from_millis(100),
    );
    (created, reusable)
}

#[tokio::test(start_paused = true)]
async fn test_run_hands_out_the_typed_resource() {
    let (created, reusable) = broker_reusable();

    let (broker, release) = reusable.run(CancellationToken::new()).await.unwrap();
    assert_eq!(broker.address, "amqp://localhost:5672/1");
    assert_eq!(created.load(Ordering::SeqCst), 1);

    release.release().await;
}

#[tokio::test(start_paused = true)]
async fn test_consumers_within_quiet_period_share_a_generation() {
    let (created, reusable) = broker_reusable();

    let (first, release) = reusable.run(CancellationToken::new()).await.unwrap();
    // The release blocks while the quiet-period window is open, so let it
    // run alongside the re-entering consumer.
    let pending_release = tokio::spawn(release.release());

    // Well inside the quiet period: same generation.
    tokio::time::sleep(Duration::from_millis(20)).await;
    let (second, release) = reusable.run(CancellationToken::new()).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(created.load(Ordering::SeqCst), 1);
    pending_release.await.unwrap();

    // This release outlives the quiet period, so the generation ends.
    release.release().await;
    let (third, release) = reusable.run(CancellationToken::new()).await.unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(created.load(Ordering::SeqCst), 2);
    release.release().await;
}

#[tokio::test(start_paused = true)]
async fn test_terminate_shuts_the_daemon_down() {
    let (_created, reusable) = broker_reusable();

    let (_broker, release) = reusable.run(CancellationToken::new()).await.unwrap();
    release.release().await;

    reusable
        .terminate(CancellationToken::new())
        .await
        .expect("terminate completes");

    let error = reusable
        .enter(CancellationToken::new())
        .await
        .expect_err("the facade is terminal after terminate");
    assert!(matches!(error, ReusableError::Enter(_)));
}

// =============================================================================
// Terminate deadline
// =============================================================================

struct StuckResource;

#[async_trait]
impl Resource for StuckResource {
    async fn terminate(&self) -> Result<(), BoxError> {
        std::future::pending::<()>().await;
        Ok(())
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

struct StuckCreator;

#[async_trait]
impl Creator for StuckCreator {
    type Output = StuckResource;

    async fn create(&self, _cancel: CancellationToken) -> Result<StuckResource, BoxError> {
        Ok(StuckResource)
    }
}

#[tokio::test(start_paused = true)]
async fn test_terminate_respects_its_deadline() {
    let reusable = Reusable::new(StuckCreator);
    reusable.enter(CancellationToken::new()).await.unwrap();

    let deadline = CancellationToken::new();
    deadline.cancel();

    let error = reusable
        .terminate(deadline)
        .await
        .expect_err("a stuck teardown must not block terminate forever");
    assert!(matches!(error, ReusableError::TerminateTimeout));
}
