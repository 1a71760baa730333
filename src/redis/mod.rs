//! Shared Redis containers.
//!
//! The key-value counterpart of [`crate::minio`]: consumers declare the
//! entries they expect, missing keys are created with `SET NX`, and the
//! release only drops the consumer's user count.

mod container;
mod error;
mod external;
mod reusable;
mod run;
mod runtime;

pub use container::RedisContainer;
pub use error::RedisError;
pub use external::{ExternalConfig, ExternalCreator, ExternalRedis, REDIS_URL_ENV};
pub use reusable::{RedisHandle, ReusableRedis};
pub use run::{init_container, run, run_config, use_external, use_external_config, OwnedRedis};
pub use runtime::{RuntimeConfig, RuntimeCreator, RuntimeRedis, REDIS_IMAGE_ENV};

use std::sync::LazyLock;

/// An entry a consumer expects to exist before it runs.
#[derive(Debug, Clone)]
pub struct Entry {
    pub key: String,
    pub value: String,
}

impl Entry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

static GLOBAL_REUSABLE: LazyLock<ReusableRedis<RuntimeCreator>> =
    LazyLock::new(|| ReusableRedis::new(RuntimeCreator::new()));

static GLOBAL_EXTERNAL_REUSABLE: LazyLock<ReusableRedis<ExternalCreator>> =
    LazyLock::new(|| ReusableRedis::new(ExternalCreator::new()));

/// The process-wide reusable backed by a containerised server.
pub fn global_reusable() -> &'static ReusableRedis<RuntimeCreator> {
    &GLOBAL_REUSABLE
}

/// The process-wide reusable backed by [`REDIS_URL_ENV`].
pub fn global_external_reusable() -> &'static ReusableRedis<ExternalCreator> {
    &GLOBAL_EXTERNAL_REUSABLE
}
