//! Connects to a MinIO deployment this process does not own.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::daemon::{BoxError, Resource};
use crate::harness::{env_value, MissingEnv};
use crate::minio::container::{s3_client, MinioContainer};
use crate::reusable::Creator;

/// Environment variable holding the endpoint of the external deployment,
/// e.g. `http://localhost:9000`.
pub const MINIO_ENDPOINT_ENV: &str = "CONTAINERS_MINIO_ENDPOINT";

/// Settings for an externally managed MinIO deployment.
#[derive(Debug, Clone)]
pub struct ExternalConfig {
    pub endpoint: String,
    pub user: String,
    pub password: String,
}

impl ExternalConfig {
    /// Default credentials with an explicit endpoint.
    pub fn endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            user: "minio".to_owned(),
            password: "minio".to_owned(),
        }
    }
}

/// Creator that points at a pre-existing MinIO deployment.
pub struct ExternalCreator {
    config: Option<ExternalConfig>,
}

impl ExternalCreator {
    /// Reads the endpoint from [`MINIO_ENDPOINT_ENV`] at creation time,
    /// with the default `minio`/`minio` credentials.
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
    type Output = ExternalMinio;

    async fn create(&self, _cancel: CancellationToken) -> Result<ExternalMinio, BoxError> {
        let config = match &self.config {
            Some(config) => config.clone(),
            None => ExternalConfig::endpoint(
                env_value(MINIO_ENDPOINT_ENV).ok_or(MissingEnv(MINIO_ENDPOINT_ENV))?,
            ),
        };

        let client = s3_client(&config.endpoint, &config.user, &config.password);
        Ok(ExternalMinio { client })
    }
}

/// A MinIO deployment owned by someone else; teardown is a no-op.
pub struct ExternalMinio {
    client: aws_sdk_s3::Client,
}

#[async_trait]
impl Resource for ExternalMinio {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl MinioContainer for ExternalMinio {
    fn client(&self) -> aws_sdk_s3::Client {
        self.client.clone()
    }
}
