//! The contract a shared MinIO backend fulfils.

use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};

use crate::daemon::Resource;

/// A shared MinIO (S3-compatible) backend the daemon can own.
pub trait MinioContainer: Resource {
    /// A client bound to this backend. `aws_sdk_s3::Client` is internally
    /// reference-counted, so handing out clones is cheap.
    fn client(&self) -> aws_sdk_s3::Client;
}

/// Builds an S3 client against a MinIO endpoint.
///
/// MinIO ignores the region but the SDK requires one; path-style addressing
/// is what MinIO serves buckets under.
pub(crate) fn s3_client(endpoint: &str, user: &str, password: &str) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(user, password, None, None, "reusable-containers");

    let config = aws_sdk_s3::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .endpoint_url(endpoint)
        .credentials_provider(credentials)
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(config)
}
