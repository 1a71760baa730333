//! Connects to a Redis server this process does not own.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::daemon::{BoxError, Resource};
use crate::harness::{env_value, MissingEnv};
use crate::redis::container::RedisContainer;
use crate::reusable::Creator;

/// Environment variable holding the URL of the external server,
/// e.g. `redis://localhost:6379`.
pub const REDIS_URL_ENV: &str = "CONTAINERS_REDIS_URL";

/// Settings for an externally managed Redis server.
#[derive(Debug, Clone)]
pub struct ExternalConfig {
    pub url: String,
}

/// Creator that points at a pre-existing Redis server.
pub struct ExternalCreator {
    config: Option<ExternalConfig>,
}

impl ExternalCreator {
    /// Reads the URL from [`REDIS_URL_ENV`] at creation time.
    pub fn new() -> Self {
        Self { config: None }
    }

    pub fn with_config(config: ExternalConfig) -> Self {
        Self {
            config: Some(config),
        }
    }
}

impl Default for ExternalCreator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Creator for ExternalCreator {
    type Output = ExternalRedis;

    async fn create(&self, _cancel: CancellationToken) -> Result<ExternalRedis, BoxError> {
        let url = match &self.config {
            Some(config) => config.url.clone(),
            None => env_value(REDIS_URL_ENV).ok_or(MissingEnv(REDIS_URL_ENV))?,
        };

        Ok(ExternalRedis { url })
    }
}

/// A Redis server owned by someone else; teardown is a no-op.
pub struct ExternalRedis {
    url: String,
}

#[async_trait]
impl Resource for ExternalRedis {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl RedisContainer for ExternalRedis {
    fn url(&self) -> String {
        self.url.clone()
    }
}
