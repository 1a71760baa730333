//! End-to-end MinIO tests against a real container.
//!
//! These need a running Docker daemon, so they are ignored by default:
//!
//! ```text
//! cargo test --test minio_containers -- --ignored
//! ```

use reusable_containers::minio::{self, Bucket, File};
use reusable_containers::skip_if_disabled;
use tokio_util::sync::CancellationToken;

async fn object_bytes(client: &aws_sdk_s3::Client, bucket: &str, key: &str) -> Vec<u8> {
    let object = client
        .get_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .unwrap();
    object.body.collect().await.unwrap().into_bytes().to_vec()
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a running Docker daemon"]
async fn test_declared_buckets_and_objects_exist() {
    skip_if_disabled!();

    let buckets = [Bucket::with_files(
        "invoices",
        vec![File::new("seed.csv", &b"id,total\n1,10\n"[..])],
    )];

    let handle = minio::global_reusable()
        .run(CancellationToken::new(), &buckets)
        .await
        .unwrap();

    let content = object_bytes(handle.client(), "invoices", "seed.csv").await;
    assert_eq!(content, b"id,total\n1,10\n");
    handle.release().await;
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a running Docker daemon"]
async fn test_bucket_creation_is_idempotent() {
    skip_if_disabled!();

    let reusable = minio::global_reusable();
    let buckets = [Bucket::new("shared-bucket")];

    let first = reusable
        .run(CancellationToken::new(), &buckets)
        .await
        .unwrap();
    // Declaring the same bucket again must not fail.
    let second = reusable
        .run(CancellationToken::new(), &buckets)
        .await
        .unwrap();

    first.release().await;
    second.release().await;
}
