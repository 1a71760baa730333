//! Shared Postgres containers with per-consumer schema isolation.
//!
//! The common entry point is a [`ReusablePostgres`]: every consumer gets a
//! fresh schema inside one shared server, so parallel tests never collide
//! while paying the container startup cost once per wave. The process-wide
//! [`global_reusable`] covers the usual case; construct your own
//! `ReusablePostgres` when a suite needs different container settings or a
//! different quiet period.
//!
//! # Example
//!
//! ```ignore
//! use reusable_containers::postgres::{self, SqlMigrations};
//! use tokio_util::sync::CancellationToken;
//!
//! let migrations = SqlMigrations::new(["CREATE TABLE users (name TEXT)"]);
//! let handle = postgres::global_reusable()
//!     .run(CancellationToken::new(), Some(&migrations), &[])
//!     .await?;
//!
//! handle.client().execute("INSERT INTO users (name) VALUES ($1)", &[&"amelia"]).await?;
//! handle.release().await;
//! ```

mod container;
mod error;
mod external;
mod migrations;
mod query;
mod reusable;
mod run;
mod runtime;

pub use container::PostgresContainer;
pub use error::PostgresError;
pub use external::{
    ExternalConfig, ExternalCreator, ExternalPostgres, POSTGRES_CONNECTION_STRING_ENV,
};
pub use migrations::{DirMigrations, Migrations, NoMigrations, SqlMigrations};
pub use query::{BuildQuery, Query, SqlParams};
pub use reusable::{PostgresHandle, ReusablePostgres};
pub use run::{init_container, run, run_config, use_external, use_external_config, OwnedPostgres};
pub use runtime::{RuntimeConfig, RuntimeCreator, RuntimePostgres, POSTGRES_IMAGE_ENV};

use std::sync::LazyLock;

static GLOBAL_REUSABLE: LazyLock<ReusablePostgres<RuntimeCreator>> =
    LazyLock::new(|| ReusablePostgres::new(RuntimeCreator::new()));

static GLOBAL_EXTERNAL_REUSABLE: LazyLock<ReusablePostgres<ExternalCreator>> =
    LazyLock::new(|| ReusablePostgres::new(ExternalCreator::new()));

/// The process-wide reusable backed by a containerised server.
pub fn global_reusable() -> &'static ReusablePostgres<RuntimeCreator> {
    &GLOBAL_REUSABLE
}

/// The process-wide reusable backed by
/// [`POSTGRES_CONNECTION_STRING_ENV`].
pub fn global_external_reusable() -> &'static ReusablePostgres<ExternalCreator> {
    &GLOBAL_EXTERNAL_REUSABLE
}
