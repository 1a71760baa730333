//! Shared MinIO (S3-compatible) containers.
//!
//! Parallel to [`crate::postgres`] but without per-consumer namespaces:
//! consumers declare the buckets and initial objects they need, the adapter
//! creates whatever is missing, and the release only drops the consumer's
//! user count.
//!
//! # Example
//!
//! ```ignore
//! use reusable_containers::minio::{self, Bucket, File};
//! use tokio_util::sync::CancellationToken;
//!
//! let buckets = [Bucket::with_files(
//!     "invoices",
//!     vec![File::new("seed.csv", &b"id,total\n"[..])],
//! )];
//! let handle = minio::global_reusable()
//!     .run(CancellationToken::new(), &buckets)
//!     .await?;
//!
//! let object = handle.client().get_object().bucket("invoices").key("seed.csv").send().await?;
//! handle.release().await;
//! ```

mod bucket;
mod container;
mod error;
mod external;
mod reusable;
mod run;
mod runtime;

pub use bucket::{Bucket, File};
pub use container::MinioContainer;
pub use error::MinioError;
pub use external::{ExternalConfig, ExternalCreator, ExternalMinio, MINIO_ENDPOINT_ENV};
pub use reusable::{MinioHandle, ReusableMinio};
pub use run::{init_container, run, run_config, use_external, use_external_config, OwnedMinio};
pub use runtime::{RuntimeConfig, RuntimeCreator, RuntimeMinio, MINIO_IMAGE_ENV};

use std::sync::LazyLock;

static GLOBAL_REUSABLE: LazyLock<ReusableMinio<RuntimeCreator>> =
    LazyLock::new(|| ReusableMinio::new(RuntimeCreator::new()));

static GLOBAL_EXTERNAL_REUSABLE: LazyLock<ReusableMinio<ExternalCreator>> =
    LazyLock::new(|| ReusableMinio::new(ExternalCreator::new()));

/// The process-wide reusable backed by a containerised deployment.
pub fn global_reusable() -> &'static ReusableMinio<RuntimeCreator> {
    &GLOBAL_REUSABLE
}

/// The process-wide reusable backed by [`MINIO_ENDPOINT_ENV`].
pub fn global_external_reusable() -> &'static ReusableMinio<ExternalCreator> {
    &GLOBAL_EXTERNAL_REUSABLE
}
