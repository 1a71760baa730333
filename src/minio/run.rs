//! One-shot MinIO entry points: a dedicated backend per caller, terminated
//! by the release instead of being shared through the daemon.

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::daemon::Resource;
use crate::minio::bucket::{insert_buckets, Bucket};
use crate::minio::container::MinioContainer;
use crate::minio::external::{ExternalConfig, ExternalCreator, ExternalMinio};
use crate::minio::runtime::{RuntimeConfig, RuntimeCreator, RuntimeMinio};
use crate::minio::MinioError;
use crate::reusable::Creator;

/// Starts a dedicated MinIO container and prepares the declared buckets.
pub async fn run(
    ctx: CancellationToken,
    buckets: &[Bucket],
) -> Result<OwnedMinio<RuntimeMinio>, MinioError> {
    run_config(ctx, RuntimeConfig::default(), buckets).await
}

/// [`run`] with explicit container settings.
pub async fn run_config(
    ctx: CancellationToken,
    config: RuntimeConfig,
    buckets: &[Bucket],
) -> Result<OwnedMinio<RuntimeMinio>, MinioError> {
    let container = RuntimeCreator::with_config(config)
        .create(ctx)
        .await
        .map_err(MinioError::CreateContainer)?;
    init_container(container, buckets).await
}

/// Connects to an externally managed deployment and prepares the declared
/// buckets.
pub async fn use_external(
    ctx: CancellationToken,
    buckets: &[Bucket],
) -> Result<OwnedMinio<ExternalMinio>, MinioError> {
    let container = ExternalCreator::new()
        .create(ctx)
        .await
        .map_err(MinioError::CreateContainer)?;
    init_container(container, buckets).await
}

/// [`use_external`] with explicit endpoint and credentials.
pub async fn use_external_config(
    ctx: CancellationToken,
    config: ExternalConfig,
    buckets: &[Bucket],
) -> Result<OwnedMinio<ExternalMinio>, MinioError> {
    let container = ExternalCreator::with_config(config)
        .create(ctx)
        .await
        .map_err(MinioError::CreateContainer)?;
    init_container(container, buckets).await
}

/// Prepares the declared buckets on `container` and wraps it into an
/// [`OwnedMinio`].
pub async fn init_container<R: MinioContainer>(
    container: R,
    buckets: &[Bucket],
) -> Result<OwnedMinio<R>, MinioError> {
    let client = container.client();

    match insert_buckets(&client, buckets).await {
        Ok(()) => Ok(OwnedMinio { client, container }),
        Err(error) => {
            terminate_quietly(&container).await;
            Err(error)
        }
    }
}

async fn terminate_quietly<R: MinioContainer>(container: &R) {
    if let Err(error) = container.terminate().await {
        warn!("failed to terminate minio container: {error}");
    }
}

/// A dedicated MinIO backend owned by a single consumer.
pub struct OwnedMinio<R: MinioContainer> {
    client: aws_sdk_s3::Client,
    container: R,
}

impl<R: MinioContainer> OwnedMinio<R> {
    pub fn client(&self) -> &aws_sdk_s3::Client {
        &self.client
    }

    /// Terminates the backend.
    pub async fn release(self) {
        terminate_quietly(&self.container).await;
    }
}
