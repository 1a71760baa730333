//! Launches a disposable Postgres container for the current process.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio_postgres::config::SslMode;
use tokio_util::sync::CancellationToken;

use crate::daemon::{BoxError, Resource};
use crate::harness::{env_value, split_image};
use crate::postgres::PostgresContainer;
use crate::reusable::Creator;

/// Environment variable overriding the Postgres image, e.g.
/// `postgres:17-alpine`.
pub const POSTGRES_IMAGE_ENV: &str = "CONTAINERS_POSTGRES_IMAGE";

const POSTGRES_PORT: u16 = 5432;

/// Settings for a containerised Postgres server.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub db_name: String,
    pub db_user: String,
    pub db_password: String,
    /// Image reference; overridden by [`POSTGRES_IMAGE_ENV`] when set.
    pub image: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            db_name: "test".to_owned(),
            db_user: "admin".to_owned(),
            db_password: "admin".to_owned(),
            image: "postgres:16-alpine".to_owned(),
        }
    }
}

/// Creator that starts a Postgres container on first use.
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
    type Output = RuntimePostgres;

    async fn create(&self, _cancel: CancellationToken) -> Result<RuntimePostgres, BoxError> {
        let image = env_value(POSTGRES_IMAGE_ENV).unwrap_or_else(|| self.config.image.clone());
        let (name, tag) = split_image(&image);

        let container = Postgres::default()
            .with_db_name(&self.config.db_name)
            .with_user(&self.config.db_user)
            .with_password(&self.config.db_password)
            .with_name(name)
            .with_tag(tag)
            .start()
            .await?;

        let host = container.get_host().await?.to_string();
        let port = container.get_host_port_ipv4(POSTGRES_PORT).await?;

        let mut config = tokio_postgres::Config::new();
        config
            .host(&host)
            .port(port)
            .user(&self.config.db_user)
            .password(&self.config.db_password)
            .dbname(&self.config.db_name)
            .ssl_mode(SslMode::Disable);

        Ok(RuntimePostgres { container, config })
    }
}

/// A Postgres server running in a container owned by this process.
pub struct RuntimePostgres {
    container: ContainerAsync<Postgres>,
    config: tokio_postgres::Config,
}

#[async_trait]
impl Resource for RuntimePostgres {
    async fn terminate(&self) -> Result<(), BoxError> {
        self.container.stop().await?;
        Ok(())
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl PostgresContainer for RuntimePostgres {
    fn config(&self) -> tokio_postgres::Config {
        self.config.clone()
    }
}
