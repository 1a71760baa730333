//! The reusable-resource daemon.
//!
//! A [`ReusableDaemon`] lets many independent consumers (typically parallel
//! test cases) share one expensive backend, such as a database server or
//! an object store, for the lifetime of the process. The resource is created lazily
//! on the first [`enter`](ReusableDaemon::enter) and torn down once the
//! active-user count has stayed at zero for a configured quiet period, so
//! waves of tests that start and finish close together pay the creation
//! cost exactly once.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐
//! │ Consumer A │──┐
//! └────────────┘  │  Request { Enter/Exit, cancel, respond_to }
//! ┌────────────┐  ├──────────────────────────────► ┌────────────┐
//! │ Consumer B │──┘                                │ Owner task │
//! └────────────┘  ◄── Reply (per-request oneshot) ─└────────────┘
//! ```
//!
//! All daemon state (`active_users`, the live resource) is owned by a single
//! task; consumers talk to it over a rendezvous channel and every request is
//! answered on its own oneshot sender. That strict 1:1 pairing is what makes
//! two racing first enters resolve to a single factory call: one of them
//! drives the creation, the other is served only after the handle is stored.

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Boxed error used wherever callers supply their own failure types.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A shared backend handle owned by a [`ReusableDaemon`].
///
/// The daemon never introspects the resource beyond teardown: when a
/// generation ends, [`terminate`](Resource::terminate) runs exactly once.
/// Handles for backends the process does not own (an externally managed
/// database, for example) keep the default no-op body.
#[async_trait]
pub trait Resource: Any + Send + Sync {
    /// Destroys the underlying backend.
    ///
    /// Called at most once per generation, after the handle has already
    /// left the daemon's state. Errors are logged and swallowed so that a
    /// failed teardown cannot block the next generation.
    async fn terminate(&self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Upcast used by typed facades to recover the concrete resource type.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Future returned by a resource factory.
pub type ResourceFuture =
    Pin<Box<dyn Future<Output = Result<Arc<dyn Resource>, BoxError>> + Send>>;

/// Factory invoked to create a fresh resource, at most once per generation.
///
/// The [`CancellationToken`] is the one passed by the `enter` caller that
/// triggered the creation, so a slow factory can honour caller cancellation.
pub type CreateResourceFn = Box<dyn Fn(CancellationToken) -> ResourceFuture + Send + Sync>;

/// Wraps a plain async closure into a [`CreateResourceFn`].
pub fn factory_fn<F, Fut>(factory: F) -> CreateResourceFn
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Arc<dyn Resource>, BoxError>> + Send + 'static,
{
    Box::new(move |cancel| Box::pin(factory(cancel)))
}

/// Errors surfaced by [`ReusableDaemon::enter`].
#[derive(Debug, Error)]
pub enum DaemonError {
    /// The factory failed; no resource was stored and the next enter
    /// will retry the creation.
    #[error("create new resource: {0}")]
    Create(#[source] BoxError),

    /// The daemon's root token was cancelled before or while the call
    /// was queued. Terminal: every later enter fails the same way.
    #[error("reuse daemon root context is done")]
    RootCancelled,
}

// =============================================================================
// Protocol types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Enter,
    Exit,
}

struct Request {
    command: Command,
    /// Forwarded to the factory on a creating Enter; unused otherwise.
    cancel: CancellationToken,
    respond_to: oneshot::Sender<Reply>,
}

enum Reply {
    /// Answer to an Enter: the live handle for the current generation.
    Resource(Arc<dyn Resource>),
    /// Answer to an Exit (or an Enter served while another request already
    /// holds the handle it needs).
    Ack,
    Failed(DaemonError),
}

enum Flow {
    Continue,
    Shutdown,
}

// =============================================================================
// Daemon handle
// =============================================================================

/// Handle to a running reusable-resource daemon.
///
/// Cloning is cheap; all clones talk to the same owner task. Dropping every
/// clone closes the request channel, which the owner treats exactly like a
/// root cancellation: one final teardown, then exit.
#[derive(Clone)]
pub struct ReusableDaemon {
    requests: mpsc::Sender<Request>,
    root: CancellationToken,
    done: CancellationToken,
}

impl ReusableDaemon {
    /// Starts the owner task and returns immediately.
    ///
    /// # Arguments
    ///
    /// * `root` - cancelling this token puts the daemon into terminal
    ///   teardown; all subsequent enters fail with
    ///   [`DaemonError::RootCancelled`]
    /// * `quiet_period` - how long `active_users == 0` must persist before
    ///   the resource is torn down; `Duration::ZERO` tears down immediately
    ///   once idle
    /// * `factory` - invoked at most once per resource generation
    pub fn start(
        root: CancellationToken,
        quiet_period: Duration,
        factory: CreateResourceFn,
    ) -> Self {
        let (requests, inbox) = mpsc::channel(1);
        let done = CancellationToken::new();

        let owner = Owner {
            active_users: 0,
            resource: None,
            quiet_period,
            factory,
            root: root.clone(),
            done: done.clone(),
            inbox,
        };
        tokio::spawn(owner.run());

        Self {
            requests,
            root,
            done,
        }
    }

    /// Registers the caller as a user and returns the shared handle,
    /// creating it first if no generation is live.
    ///
    /// Blocks while the owner task is serving another request or running the
    /// factory; that wait is the serialisation point that guarantees a
    /// single creation. `ctx` is forwarded to the factory only; it never
    /// aborts a queued rendezvous.
    ///
    /// # Errors
    ///
    /// [`DaemonError::RootCancelled`] if the root token is already cancelled
    /// or cancels while the request is queued; [`DaemonError::Create`] if
    /// the factory fails.
    pub async fn enter(&self, ctx: CancellationToken) -> Result<Arc<dyn Resource>, DaemonError> {
        let (respond_to, response) = oneshot::channel();
        let request = Request {
            command: Command::Enter,
            cancel: ctx,
            respond_to,
        };

        tokio::select! {
            _ = self.root.cancelled() => return Err(DaemonError::RootCancelled),
            sent = self.requests.send(request) => {
                if sent.is_err() {
                    return Err(DaemonError::RootCancelled);
                }
            }
        }

        match response.await {
            Ok(Reply::Resource(resource)) => Ok(resource),
            Ok(Reply::Failed(error)) => Err(error),
            Ok(Reply::Ack) => unreachable!("enter acknowledged without a resource"),
            // The owner dropped the pending request during terminal teardown.
            Err(_) => Err(DaemonError::RootCancelled),
        }
    }

    /// Releases one user.
    ///
    /// When this drives the active-user count to zero the owner opens the
    /// quiet-period window; the call returns once the window resolves
    /// (teardown, or a re-entering consumer). If the root token is already
    /// cancelled, waits until the terminal teardown has completed.
    ///
    /// # Panics
    ///
    /// Panics if called more times than [`enter`](Self::enter) succeeded;
    /// the counter is never allowed to go negative silently.
    pub async fn exit(&self) {
        let (respond_to, response) = oneshot::channel();
        let request = Request {
            command: Command::Exit,
            cancel: CancellationToken::new(),
            respond_to,
        };

        tokio::select! {
            _ = self.root.cancelled() => {
                self.done.cancelled().await;
            }
            sent = self.requests.send(request) => match sent {
                Ok(()) => match response.await {
                    Ok(_reply) => {}
                    Err(_) if self.root.is_cancelled() => self.done.cancelled().await,
                    Err(_) => panic!(
                        "reuse daemon owner task is gone; exit called more times than enter?"
                    ),
                },
                Err(_) if self.root.is_cancelled() => self.done.cancelled().await,
                Err(_) => panic!(
                    "reuse daemon owner task is gone; exit called more times than enter?"
                ),
            },
        }
    }

    /// Resolves after the owner task has finished its terminal teardown and
    /// exited. Fires exactly once per daemon.
    pub async fn done(&self) {
        self.done.cancelled().await;
    }

    /// Whether the terminal teardown has already completed.
    pub fn is_done(&self) -> bool {
        self.done.is_cancelled()
    }
}

// =============================================================================
// Owner task
// =============================================================================

/// The single task that owns `active_users` and the live resource.
///
/// State machine: `Idle-empty` → (enter, creates) → `Serving` →
/// (exit to zero) → `Idle-quiet` → (timer) → `Idle-empty`, with a
/// re-entering consumer taking `Idle-quiet` back to `Serving` without a
/// factory call. Root cancellation terminates from any state.
struct Owner {
    active_users: usize,
    resource: Option<Arc<dyn Resource>>,
    quiet_period: Duration,
    factory: CreateResourceFn,
    root: CancellationToken,
    done: CancellationToken,
    inbox: mpsc::Receiver<Request>,
}

impl Owner {
    async fn run(mut self) {
        loop {
            let flow = tokio::select! {
                _ = self.root.cancelled() => Flow::Shutdown,
                request = self.inbox.recv() => match request {
                    Some(request) => self.handle_request(request).await,
                    None => Flow::Shutdown,
                },
            };

            if let Flow::Shutdown = flow {
                break;
            }
        }

        self.clear_resource().await;
        self.done.cancel();
        debug!("reuse daemon owner task exited");
    }

    async fn handle_request(&mut self, request: Request) -> Flow {
        match request.command {
            Command::Enter => self.active_users += 1,
            Command::Exit => {
                if self.active_users == 0 {
                    panic!("reuse daemon exit without a matching enter");
                }
                self.active_users -= 1;
            }
        }

        if self.active_users > 0 {
            self.serve(request).await;
            Flow::Continue
        } else {
            self.quiet_window(request.respond_to).await
        }
    }

    /// Answers a request while at least one user holds the resource,
    /// creating the resource first if no generation is live.
    async fn serve(&mut self, request: Request) {
        if request.command == Command::Enter && self.resource.is_none() {
            match (self.factory)(request.cancel).await {
                Ok(resource) => self.resource = Some(resource),
                Err(source) => {
                    let _ = request
                        .respond_to
                        .send(Reply::Failed(DaemonError::Create(source)));
                    return;
                }
            }
        }

        let reply = match request.command {
            Command::Enter => Reply::Resource(
                self.resource
                    .clone()
                    .expect("resource live while serving an enter"),
            ),
            Command::Exit => Reply::Ack,
        };
        let _ = request.respond_to.send(reply);
    }

    /// The quiet-period window: `active_users == 0` with the resource still
    /// live. The exit that drove the counter to zero is answered only when
    /// the window resolves, so its caller observes the outcome.
    async fn quiet_window(&mut self, exit_ack: oneshot::Sender<Reply>) -> Flow {
        tokio::select! {
            _ = tokio::time::sleep(self.quiet_period) => {
                self.clear_resource().await;
                let _ = exit_ack.send(Reply::Ack);
                Flow::Continue
            }
            _ = self.root.cancelled() => {
                let _ = exit_ack.send(Reply::Ack);
                Flow::Shutdown
            }
            request = self.inbox.recv() => match request {
                Some(request) => match request.command {
                    Command::Enter => {
                        // The reuse path: the still-live handle is handed
                        // out again without touching the factory.
                        self.active_users += 1;
                        let _ = exit_ack.send(Reply::Ack);
                        self.serve(request).await;
                        Flow::Continue
                    }
                    Command::Exit => {
                        panic!("reuse daemon exit while idle; exit called more times than enter")
                    }
                },
                None => {
                    let _ = exit_ack.send(Reply::Ack);
                    Flow::Shutdown
                }
            }
        }
    }

    /// Idempotent teardown: takes the handle out of daemon state first,
    /// then terminates it. A terminate failure is logged and swallowed so
    /// the next enter can start a fresh generation.
    async fn clear_resource(&mut self) {
        let Some(resource) = self.resource.take() else {
            return;
        };

        debug!("tearing down reusable resource");
        if let Err(error) = resource.terminate().await {
            warn!("failed to terminate reusable resource: {error}");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
