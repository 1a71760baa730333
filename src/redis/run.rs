//! One-shot Redis entry points: a dedicated backend per caller, terminated
//! by the release instead of being shared through the daemon.

use redis::aio::MultiplexedConnection;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::daemon::Resource;
use crate::redis::container::{connect_and_seed, RedisContainer};
use crate::redis::external::{ExternalConfig, ExternalCreator, ExternalRedis};
use crate::redis::runtime::{RuntimeConfig, RuntimeCreator, RuntimeRedis};
use crate::redis::{Entry, RedisError};
use crate::reusable::Creator;

/// Starts a dedicated Redis container and seeds the declared entries.
pub async fn run(
    ctx: CancellationToken,
    entries: &[Entry],
) -> Result<OwnedRedis<RuntimeRedis>, RedisError> {
    run_config(ctx, RuntimeConfig::default(), entries).await
}

/// [`run`] with explicit container settings.
pub async fn run_config(
    ctx: CancellationToken,
    config: RuntimeConfig,
    entries: &[Entry],
) -> Result<OwnedRedis<RuntimeRedis>, RedisError> {
    let container = RuntimeCreator::with_config(config)
        .create(ctx)
        .await
        .map_err(RedisError::CreateContainer)?;
    init_container(container, entries).await
}

/// Connects to an externally managed server and seeds the declared entries.
pub async fn use_external(
    ctx: CancellationToken,
    entries: &[Entry],
) -> Result<OwnedRedis<ExternalRedis>, RedisError> {
    let container = ExternalCreator::new()
        .create(ctx)
        .await
        .map_err(RedisError::CreateContainer)?;
    init_container(container, entries).await
}

/// [`use_external`] with an explicit URL.
pub async fn use_external_config(
    ctx: CancellationToken,
    config: ExternalConfig,
    entries: &[Entry],
) -> Result<OwnedRedis<ExternalRedis>, RedisError> {
    let container = ExternalCreator::with_config(config)
        .create(ctx)
        .await
        .map_err(RedisError::CreateContainer)?;
    init_container(container, entries).await
}

/// Seeds the declared entries on `container` and wraps it into an
/// [`OwnedRedis`].
pub async fn init_container<R: RedisContainer>(
    container: R,
    entries: &[Entry],
) -> Result<OwnedRedis<R>, RedisError> {
    match connect_and_seed(&container.url(), entries).await {
        Ok(connection) => Ok(OwnedRedis {
            connection,
            container,
        }),
        Err(error) => {
            terminate_quietly(&container).await;
            Err(error)
        }
    }
}

async fn terminate_quietly<R: RedisContainer>(container: &R) {
    if let Err(error) = container.terminate().await {
        warn!("failed to terminate redis container: {error}");
    }
}

/// A dedicated Redis backend owned by a single consumer.
pub struct OwnedRedis<R: RedisContainer> {
    connection: MultiplexedConnection,
    container: R,
}

impl<R: RedisContainer> OwnedRedis<R> {
    pub fn connection(&self) -> MultiplexedConnection {
        self.connection.clone()
    }

    /// Terminates the backend.
    pub async fn release(self) {
        terminate_quietly(&self.container).await;
    }
}
