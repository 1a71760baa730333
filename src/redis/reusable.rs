//! Sharing one Redis backend between consumers.
//!
//! Consumers declare the keys they expect; missing ones are created with
//! `SET NX` before the connection is handed out. Keys are shared state;
//! consumers that need isolation should prefix their keys themselves.

use std::time::Duration;

use redis::aio::MultiplexedConnection;
use tokio_util::sync::CancellationToken;

use crate::redis::container::{connect_and_seed, RedisContainer};
use crate::redis::{Entry, RedisError};
use crate::reusable::{Creator, Release, Reusable, ReusableError};

/// A shared Redis container.
pub struct ReusableRedis<C: Creator> {
    inner: Reusable<C>,
}

impl<C> ReusableRedis<C>
where
    C: Creator,
    C::Output: RedisContainer,
{
    pub fn new(creator: C) -> Self {
        Self {
            inner: Reusable::new(creator),
        }
    }

    pub fn with_quiet_period(creator: C, quiet_period: Duration) -> Self {
        Self {
            inner: Reusable::with_quiet_period(creator, quiet_period),
        }
    }

    /// Enters the shared container, seeds the declared entries, and returns
    /// a handle to the store.
    ///
    /// # Errors
    ///
    /// Any failure after the container was entered releases the consumer's
    /// user count before returning.
    pub async fn run(
        &self,
        ctx: CancellationToken,
        entries: &[Entry],
    ) -> Result<RedisHandle, RedisError> {
        let (container, release) = self.inner.run(ctx).await?;

        match connect_and_seed(&container.url(), entries).await {
            Ok(connection) => Ok(RedisHandle {
                connection,
                release,
            }),
            Err(error) => {
                release.release().await;
                Err(error)
            }
        }
    }

    /// Tears the shared container down, bounded by `ctx`.
    pub async fn terminate(&self, ctx: CancellationToken) -> Result<(), ReusableError> {
        self.inner.terminate(ctx).await
    }
}

/// A consumer's view of the shared key-value store.
pub struct RedisHandle {
    connection: MultiplexedConnection,
    release: Release,
}

impl RedisHandle {
    /// A connection to the store. `MultiplexedConnection` is designed to be
    /// cloned per task.
    pub fn connection(&self) -> MultiplexedConnection {
        self.connection.clone()
    }

    /// Releases the shared container.
    pub async fn release(self) {
        self.release.release().await;
    }
}
