//! Launches a disposable MinIO container for the current process.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::minio::MinIO;
use tokio_util::sync::CancellationToken;

use crate::daemon::{BoxError, Resource};
use crate::harness::{env_value, split_image};
use crate::minio::container::{s3_client, MinioContainer};
use crate::reusable::Creator;

/// Environment variable overriding the MinIO image.
pub const MINIO_IMAGE_ENV: &str = "CONTAINERS_MINIO_IMAGE";

const MINIO_PORT: u16 = 9000;

/// Settings for a containerised MinIO server.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub user: String,
    pub password: String,
    /// Image reference; overridden by [`MINIO_IMAGE_ENV`] when set.
    pub image: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            user: "minioadmin".to_owned(),
            password: "minioadmin".to_owned(),
            image: "minio/minio:RELEASE.2024-01-16T16-07-38Z".to_owned(),
        }
    }
}

/// Creator that starts a MinIO container on first use.
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
    type Output = RuntimeMinio;

    async fn create(&self, _cancel: CancellationToken) -> Result<RuntimeMinio, BoxError> {
        let image = env_value(MINIO_IMAGE_ENV).unwrap_or_else(|| self.config.image.clone());
        let (name, tag) = split_image(&image);

        let container = MinIO::default()
            .with_name(name)
            .with_tag(tag)
            .with_env_var("MINIO_ROOT_USER", &self.config.user)
            .with_env_var("MINIO_ROOT_PASSWORD", &self.config.password)
            .start()
            .await?;

        let host = container.get_host().await?.to_string();
        let port = container.get_host_port_ipv4(MINIO_PORT).await?;
        let endpoint = format!("http://{host}:{port}");

        let client = s3_client(&endpoint, &self.config.user, &self.config.password);
        Ok(RuntimeMinio { container, client })
    }
}

/// A MinIO server running in a container owned by this process.
pub struct RuntimeMinio {
    container: ContainerAsync<MinIO>,
    client: aws_sdk_s3::Client,
}

#[async_trait]
impl Resource for RuntimeMinio {
    async fn terminate(&self) -> Result<(), BoxError> {
        self.container.stop().await?;
        Ok(())
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl MinioContainer for RuntimeMinio {
    fn client(&self) -> aws_sdk_s3::Client {
        self.client.clone()
    }
}
