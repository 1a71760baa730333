//! Launches a disposable Redis container for the current process.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::redis::Redis;
use tokio_util::sync::CancellationToken;

use crate::daemon::{BoxError, Resource};
use crate::harness::{env_value, split_image};
use crate::redis::container::RedisContainer;
use crate::reusable::Creator;

/// Environment variable overriding the Redis image.
pub const REDIS_IMAGE_ENV: &str = "CONTAINERS_REDIS_IMAGE";

const REDIS_PORT: u16 = 6379;

/// Settings for a containerised Redis server.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Image reference; overridden by [`REDIS_IMAGE_ENV`] when set.
    pub image: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            image: "redis:7-alpine".to_owned(),
        }
    }
}

/// Creator that starts a Redis container on first use.
pub struct RuntimeCreator {
    config: RuntimeConfig,
}

impl RuntimeCreator {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self { config }
    }
}

impl Default for RuntimeCreator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Creator for RuntimeCreator {
    type Output = RuntimeRedis;

    async fn create(&self, _cancel: CancellationToken) -> Result<RuntimeRedis, BoxError> {
        let image = env_value(REDIS_IMAGE_ENV).unwrap_or_else(|| self.config.image.clone());
        let (name, tag) = split_image(&image);

        let container = Redis::default()
            .with_name(name)
            .with_tag(tag)
            .start()
            .await?;

        let host = container.get_host().await?.to_string();
        let port = container.get_host_port_ipv4(REDIS_PORT).await?;

        Ok(RuntimeRedis {
            container,
            url: format!("redis://{host}:{port}"),
        })
    }
}

/// A Redis server running in a container owned by this process.
pub struct RuntimeRedis {
    container: ContainerAsync<Redis>,
    url: String,
}

#[async_trait]
impl Resource for RuntimeRedis {
    async fn terminate(&self) -> Result<(), BoxError> {
        self.container.stop().await?;
        Ok(())
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl RedisContainer for RuntimeRedis {
    fn url(&self) -> String {
        self.url.clone()
    }
}
