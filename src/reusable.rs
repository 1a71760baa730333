//! Typed facade over the reusable-resource daemon.
//!
//! [`Reusable`] pairs a [`Creator`] with a lazily started [`ReusableDaemon`]
//! and recovers the concrete resource type from the daemon's type-erased
//! handle, so consumers never see the erasure. The backend adapters
//! ([`crate::postgres`], [`crate::minio`], [`crate::redis`]) build their
//! per-consumer isolation on top of this type.
//!
//! # Example
//!
//! ```ignore
//! use reusable_containers::postgres::{ReusablePostgres, RuntimeCreator};
//!
//! let reusable = ReusablePostgres::new(RuntimeCreator::new());
//! let handle = reusable.run(ctx, None, &[]).await?;
//! // ... use handle.client() ...
//! handle.release().await;
//! ```

use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::daemon::{BoxError, CreateResourceFn, DaemonError, Resource, ReusableDaemon};

/// Default quiet period before an idle resource is torn down.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_secs(1);

/// Typed factory for a shared backend resource.
#[async_trait]
pub trait Creator: Send + Sync + 'static {
    /// The concrete resource this creator produces.
    type Output: Resource;

    /// Creates a fresh backend, honouring `cancel` where the backend
    /// supports aborting a slow startup.
    async fn create(&self, cancel: CancellationToken) -> Result<Self::Output, BoxError>;
}

/// Errors surfaced by [`Reusable`].
#[derive(Debug, Error)]
pub enum ReusableError {
    /// The underlying daemon refused the enter.
    #[error("enter to reuse container: {0}")]
    Enter(#[source] DaemonError),

    /// [`Reusable::terminate`] gave up before the daemon finished its
    /// terminal teardown.
    #[error("terminate wait cancelled before daemon shutdown completed")]
    TerminateTimeout,
}

/// Releases one user of a [`Reusable`].
///
/// Returned alongside the handle by [`Reusable::run`]; call
/// [`release`](Release::release) when the consumer is finished.
pub struct Release {
    daemon: ReusableDaemon,
}

impl Release {
    pub(crate) fn new(daemon: ReusableDaemon) -> Self {
        Self { daemon }
    }

    /// Exits the daemon. When this was the last user, the quiet-period
    /// window opens and the call returns once it resolves.
    pub async fn release(self) {
        self.daemon.exit().await;
    }
}

/// A lazily started, typed reusable resource.
///
/// The daemon is spawned on the first [`enter`](Reusable::enter) and shared
/// by every subsequent caller; the root token is owned here so that
/// [`terminate`](Reusable::terminate) has a cancel handle.
pub struct Reusable<C: Creator> {
    creator: Arc<C>,
    quiet_period: Duration,
    root: CancellationToken,
    daemon: OnceLock<ReusableDaemon>,
}

impl<C: Creator> Reusable<C> {
    /// Creates a reusable with the default one-second quiet period.
    pub fn new(creator: C) -> Self {
        Self::with_quiet_period(creator, DEFAULT_QUIET_PERIOD)
    }

    /// Creates a reusable that keeps an idle resource alive for
    /// `quiet_period` before tearing it down.
    pub fn with_quiet_period(creator: C, quiet_period: Duration) -> Self {
        Self {
            creator: Arc::new(creator),
            quiet_period,
            root: CancellationToken::new(),
            daemon: OnceLock::new(),
        }
    }

    /// Registers a user and returns the typed shared handle.
    ///
    /// `ctx` is forwarded to the creator when this enter triggers the
    /// creation of a fresh generation.
    ///
    /// # Errors
    ///
    /// Propagates [`DaemonError`] wrapped in [`ReusableError::Enter`].
    ///
    /// # Panics
    ///
    /// Panics if the daemon hands back a resource of an unexpected concrete
    /// type; that can only happen if two facades share one daemon, which
    /// this type never does.
    pub async fn enter(&self, ctx: CancellationToken) -> Result<Arc<C::Output>, ReusableError> {
        let resource = self
            .daemon()
            .enter(ctx)
            .await
            .map_err(ReusableError::Enter)?;

        let Ok(resource) = resource.into_any().downcast::<C::Output>() else {
            panic!("reusable resource has an unexpected concrete type");
        };
        Ok(resource)
    }

    /// Releases one user. A no-op if the daemon was never started.
    pub async fn exit(&self) {
        if let Some(daemon) = self.daemon.get() {
            daemon.exit().await;
        }
    }

    /// Enters and returns the handle together with its [`Release`].
    pub async fn run(
        &self,
        ctx: CancellationToken,
    ) -> Result<(Arc<C::Output>, Release), ReusableError> {
        let resource = self.enter(ctx).await?;
        Ok((resource, Release::new(self.daemon().clone())))
    }

    /// Cancels the daemon's root token and waits for its terminal teardown,
    /// bounded by `ctx`.
    ///
    /// # Errors
    ///
    /// [`ReusableError::TerminateTimeout`] if `ctx` cancels before the
    /// daemon publishes `done`.
    pub async fn terminate(&self, ctx: CancellationToken) -> Result<(), ReusableError> {
        self.root.cancel();

        let Some(daemon) = self.daemon.get() else {
            return Ok(());
        };

        tokio::select! {
            _ = daemon.done() => Ok(()),
            _ = ctx.cancelled() => Err(ReusableError::TerminateTimeout),
        }
    }

    /// The running daemon, started exactly once on first use.
    fn daemon(&self) -> &ReusableDaemon {
        self.daemon.get_or_init(|| {
            let factory = erase_creator(Arc::clone(&self.creator));
            ReusableDaemon::start(self.root.clone(), self.quiet_period, factory)
        })
    }
}

/// Adapts a typed creator to the daemon's type-erased factory.
fn erase_creator<C: Creator>(creator: Arc<C>) -> CreateResourceFn {
    Box::new(move |cancel| {
        let creator = Arc::clone(&creator);
        Box::pin(async move {
            let resource = creator.create(cancel).await?;
            Ok(Arc::new(resource) as Arc<dyn Resource>)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Endpoint {
        port: u16,
    }

    #[async_trait]
    impl Resource for Endpoint {
        fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    struct EndpointCreator {
        created: AtomicUsize,
    }

    #[async_trait]
    impl Creator for EndpointCreator {
        type Output = Endpoint;

        async fn create(&self, _cancel: CancellationToken) -> Result<Endpoint, BoxError> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Endpoint { port: 5432 })
        }
    }

    fn reusable() -> Reusable<EndpointCreator> {
        Reusable::new(EndpointCreator {
            created: AtomicUsize::new(0),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_enter_returns_typed_handle() {
        let reusable = reusable();

        let endpoint = reusable.enter(CancellationToken::new()).await.unwrap();
        assert_eq!(endpoint.port, 5432);

        reusable.exit().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_consumers_share_one_instance() {
        let reusable = reusable();

        let (first, release) = reusable.run(CancellationToken::new()).await.unwrap();
        let second = reusable.enter(CancellationToken::new()).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(reusable.creator.created.load(Ordering::SeqCst), 1);

        release.release().await;
        reusable.exit().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminate_rejects_later_enters() {
        let reusable = reusable();

        reusable.enter(CancellationToken::new()).await.unwrap();
        reusable.exit().await;

        reusable
            .terminate(CancellationToken::new())
            .await
            .expect("terminate completes once the daemon is done");

        let error = reusable
            .enter(CancellationToken::new())
            .await
            .expect_err("enter after terminate must fail");
        assert!(matches!(error, ReusableError::Enter(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminate_before_first_enter_is_a_noop() {
        let reusable = reusable();

        reusable
            .terminate(CancellationToken::new())
            .await
            .expect("nothing to tear down");
        assert_eq!(reusable.creator.created.load(Ordering::SeqCst), 0);
    }
}
