//! Error types for the MinIO adapters.

use thiserror::Error;

use crate::daemon::BoxError;
use crate::reusable::ReusableError;

/// Errors surfaced by the MinIO adapters.
#[derive(Debug, Error)]
pub enum MinioError {
    /// The shared container could not be entered.
    #[error(transparent)]
    Reuse(#[from] ReusableError),

    /// A dedicated (non-reused) container could not be created.
    #[error("create container: {0}")]
    CreateContainer(#[source] BoxError),

    /// Checking whether a bucket exists failed.
    #[error("get bucket exists {bucket}: {source}")]
    BucketExists {
        bucket: String,
        #[source]
        source: BoxError,
    },

    /// Creating a missing bucket failed.
    #[error("create bucket {bucket}: {source}")]
    CreateBucket {
        bucket: String,
        #[source]
        source: BoxError,
    },

    /// Uploading an initial object failed.
    #[error("put file {file} into bucket {bucket}: {source}")]
    PutObject {
        bucket: String,
        file: String,
        #[source]
        source: BoxError,
    },
}
