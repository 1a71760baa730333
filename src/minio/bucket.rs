//! Bucket and object declarations for consumers of a shared object store.
//!
//! Consumers declare what they need; the adapter creates missing buckets
//! idempotently and uploads the initial objects. Nothing is namespaced per
//! consumer. Buckets are shared state, which is exactly what object-store
//! tests usually want.

use std::io;
use std::path::Path;

use aws_sdk_s3::primitives::ByteStream;

use crate::minio::MinioError;

/// A bucket a consumer expects to exist, with its initial objects.
#[derive(Debug, Clone, Default)]
pub struct Bucket {
    pub name: String,
    pub files: Vec<File>,
}

impl Bucket {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: Vec::new(),
        }
    }

    pub fn with_files(name: impl Into<String>, files: Vec<File>) -> Self {
        Self {
            name: name.into(),
            files,
        }
    }
}

/// An object uploaded into a bucket before the consumer runs.
#[derive(Debug, Clone)]
pub struct File {
    pub name: String,
    pub content: Vec<u8>,
}

impl File {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Loads every regular file in `dir` as an object named after its
    /// file name.
    pub fn from_dir(dir: impl AsRef<Path>) -> io::Result<Vec<Self>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            files.push(Self {
                name: entry.file_name().to_string_lossy().into_owned(),
                content: std::fs::read(entry.path())?,
            });
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }
}

/// Ensures every declared bucket exists and uploads its initial objects.
///
/// Bucket creation is idempotent: an already-existing bucket is left alone
/// and only its declared objects are (re-)uploaded.
pub(crate) async fn insert_buckets(
    client: &aws_sdk_s3::Client,
    buckets: &[Bucket],
) -> Result<(), MinioError> {
    for bucket in buckets {
        insert_bucket(client, bucket).await?;
    }
    Ok(())
}

async fn insert_bucket(client: &aws_sdk_s3::Client, bucket: &Bucket) -> Result<(), MinioError> {
    let exists = match client.head_bucket().bucket(&bucket.name).send().await {
        Ok(_) => true,
        Err(error) => {
            let error = error.into_service_error();
            if error.is_not_found() {
                false
            } else {
                return Err(MinioError::BucketExists {
                    bucket: bucket.name.clone(),
                    source: error.into(),
                });
            }
        }
    };

    if !exists {
        client
            .create_bucket()
            .bucket(&bucket.name)
            .send()
            .await
            .map_err(|source| MinioError::CreateBucket {
                bucket: bucket.name.clone(),
                source: source.into(),
            })?;
    }

    for file in &bucket.files {
        client
            .put_object()
            .bucket(&bucket.name)
            .key(&file.name)
            .body(ByteStream::from(file.content.clone()))
            .send()
            .await
            .map_err(|source| MinioError::PutObject {
                bucket: bucket.name.clone(),
                file: file.name.clone(),
                source: source.into(),
            })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_from_dir_reads_contents_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.json"), b"{}").unwrap();
        std::fs::write(dir.path().join("a.txt"), b"hello").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let files = File::from_dir(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].name, "a.txt");
        assert_eq!(files[0].content, b"hello");
        assert_eq!(files[1].name, "b.json");
    }

    #[test]
    fn test_bucket_declarations() {
        let bucket = Bucket::with_files("invoices", vec![File::new("seed.csv", *b"a,b")]);
        assert_eq!(bucket.name, "invoices");
        assert_eq!(bucket.files.len(), 1);
    }
}
