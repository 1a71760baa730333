//! Error types for the Redis adapters.

use thiserror::Error;

use crate::daemon::BoxError;
use crate::reusable::ReusableError;

/// Errors surfaced by the Redis adapters.
#[derive(Debug, Error)]
pub enum RedisError {
    /// The shared container could not be entered.
    #[error(transparent)]
    Reuse(#[from] ReusableError),

    /// A dedicated (non-reused) container could not be created.
    #[error("create container: {0}")]
    CreateContainer(#[source] BoxError),

    /// Connecting to the server failed.
    #[error("connect to redis: {0}")]
    Connect(#[source] redis::RedisError),

    /// Writing an initial entry failed.
    #[error("set initial entry {key}: {source}")]
    SetEntry {
        key: String,
        #[source]
        source: redis::RedisError,
    },
}
