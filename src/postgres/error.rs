//! Error types for the Postgres adapters.

use thiserror::Error;

use crate::daemon::BoxError;
use crate::reusable::ReusableError;

/// Errors surfaced by the Postgres adapters.
#[derive(Debug, Error)]
pub enum PostgresError {
    /// The shared container could not be entered.
    #[error(transparent)]
    Reuse(#[from] ReusableError),

    /// A dedicated (non-reused) container could not be created.
    #[error("create container: {0}")]
    CreateContainer(#[source] BoxError),

    /// A connection to the server could not be established.
    #[error("connect to database: {0}")]
    Connect(#[source] tokio_postgres::Error),

    /// The per-consumer schema could not be created.
    #[error("create schema {schema}: {source}")]
    CreateSchema {
        schema: String,
        #[source]
        source: tokio_postgres::Error,
    },

    /// Applying migrations failed.
    #[error("up migrations: {0}")]
    Migrations(#[source] BoxError),

    /// An initial query failed to execute.
    #[error("exec {query} query: {source}")]
    ExecQuery {
        query: String,
        #[source]
        source: tokio_postgres::Error,
    },

    /// A query builder failed to produce SQL.
    #[error("build query: {0}")]
    BuildQuery(#[source] BoxError),
}
