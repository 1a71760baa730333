//! Sharing one MinIO backend between consumers.
//!
//! Unlike the Postgres adapter there is no per-consumer namespace: buckets
//! are shared, and each consumer just declares the ones it needs. The
//! adapter creates whatever is missing and uploads the declared objects
//! before handing out the client.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::minio::bucket::{insert_buckets, Bucket};
use crate::minio::container::MinioContainer;
use crate::minio::MinioError;
use crate::reusable::{Creator, Release, Reusable, ReusableError};

/// A shared MinIO container.
pub struct ReusableMinio<C: Creator> {
    inner: Reusable<C>,
}

impl<C> ReusableMinio<C>
where
    C: Creator,
    C::Output: MinioContainer,
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

    /// Enters the shared container, makes sure the declared buckets and
    /// objects exist, and returns a handle to the store.
    ///
    /// # Errors
    ///
    /// Any failure after the container was entered releases the consumer's
    /// user count before returning.
    pub async fn run(
        &self,
        ctx: CancellationToken,
        buckets: &[Bucket],
    ) -> Result<MinioHandle, MinioError> {
        let (container, release) = self.inner.run(ctx).await?;

        let client = container.client();
        match insert_buckets(&client, buckets).await {
            Ok(()) => Ok(MinioHandle { client, release }),
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

/// A consumer's view of the shared object store.
pub struct MinioHandle {
    client: aws_sdk_s3::Client,
    release: Release,
}

impl MinioHandle {
    pub fn client(&self) -> &aws_sdk_s3::Client {
        &self.client
    }

    /// Releases the shared container.
    pub async fn release(self) {
        self.release.release().await;
    }
}
