//! Reusable backend containers for parallel tests.
//!
//! Spinning up a database or object store per test is slow; sharing one
//! instance across a whole test binary is fast but racy to coordinate. This
//! crate provides the missing primitive: a process-local daemon that owns a
//! single expensive backend, creates it lazily on first use, hands it to
//! any number of concurrent consumers, and tears it down once the last
//! consumer has been gone for a quiet period.
//!
//! Layers, from the bottom up:
//!
//! - [`daemon`]: the type-erased [`ReusableDaemon`] with enter/exit
//!   refcounting, at-most-one creation in flight, quiet-period debounce,
//!   teardown on root cancellation.
//! - [`reusable`]: the typed [`Reusable`] facade pairing the daemon with a
//!   [`Creator`].
//! - [`postgres`], [`minio`], [`redis`]: backend adapters. Postgres
//!   additionally isolates each consumer in its own schema; the object- and
//!   key-value stores idempotently create the buckets/keys consumers
//!   declare.
//! - [`harness`]: the `CONTAINERS_DISABLE_TESTING` opt-out honoured by
//!   [`skip_if_disabled!`].
//!
//! # Example
//!
//! ```ignore
//! use reusable_containers::postgres::{self, SqlMigrations};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::test]
//! async fn finds_users_by_name() {
//!     reusable_containers::skip_if_disabled!();
//!
//!     let migrations = SqlMigrations::new(["CREATE TABLE users (name TEXT)"]);
//!     let handle = postgres::global_reusable()
//!         .run(CancellationToken::new(), Some(&migrations), &[])
//!         .await
//!         .unwrap();
//!
//!     // ... exercise handle.client() ...
//!
//!     handle.release().await;
//! }
//! ```

pub mod daemon;
pub mod harness;
pub mod minio;
pub mod postgres;
pub mod redis;
pub mod reusable;

pub use daemon::{factory_fn, BoxError, DaemonError, Resource, ReusableDaemon};
pub use harness::disabled;
pub use reusable::{Creator, Release, Reusable, ReusableError, DEFAULT_QUIET_PERIOD};
