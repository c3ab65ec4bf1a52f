mod fs;
mod minio;
mod s3;

pub use fs::FsStore;
pub use minio::MinioStore;
pub use s3::S3Store;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

use crate::config::{Backend, StorageConfig};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Invalid object key: {0}")]
    InvalidKey(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Abstraction over object storage backends.
///
/// Keys are opaque '/'-delimited paths; a trailing '/' marks a folder-scoped
/// prefix. Content round-trips unmodified. Operations are stateless
/// delegations with no coordination between concurrent callers -- two writers
/// to the same key race and the last one wins.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `data` under `key`, returning the key used. The filesystem
    /// backend rejects keys whose final segment lacks an extension.
    async fn put_object(&self, data: Bytes, key: &str) -> Result<String, StorageError>;

    /// Copy a local file into the store under `dest_prefix` + the file's
    /// name, returning the stored key.
    async fn upload_object(&self, file: &Path, dest_prefix: &str) -> Result<String, StorageError>;

    /// Create an empty marker (or directory) so listing recognizes `prefix`.
    async fn put_folder(&self, prefix: &str) -> Result<(), StorageError>;

    /// List the full keys of objects directly under `prefix` (single level,
    /// folder markers excluded), in lexicographic order.
    async fn list_files(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Fetch the full content stored under `key`.
    async fn get_object(&self, key: &str) -> Result<Bytes, StorageError>;

    /// Delete one object. A missing key is a no-op, never an error.
    async fn remove_object(&self, key: &str) -> Result<(), StorageError>;

    /// Delete every object whose key starts with `prefix`. Deletion is
    /// sequential and non-atomic: a failure partway through leaves earlier
    /// objects deleted and later ones present. Safe to re-invoke.
    async fn remove_folder(&self, prefix: &str) -> Result<(), StorageError>;

    /// A backend-specific locator for `key`: a local path (filesystem), a
    /// presigned time-limited URL (MinIO), or a public URL (S3). Stability
    /// and authentication of the result differ per backend.
    async fn object_url(&self, key: &str) -> Result<String, StorageError>;

    /// Timestamp of the last write to `key`.
    async fn last_modified(&self, key: &str) -> Result<DateTime<Utc>, StorageError>;
}

/// Build the backend selected by `config`. Remote backends construct their
/// client and ensure the target bucket exists; any failure there is fatal.
pub async fn from_config(config: &StorageConfig) -> anyhow::Result<Arc<dyn ObjectStorage>> {
    config.validate()?;

    match config.backend {
        Backend::Filesystem => {
            let store = FsStore::new(&config.root_dir)?;
            info!(root = %config.root_dir, "using filesystem storage backend");
            Ok(Arc::new(store))
        }
        Backend::Minio => {
            let bucket = config.bucket.as_deref().expect("validated");
            let store = MinioStore::new(
                bucket,
                config.endpoint.as_deref().expect("validated"),
                config.access_key.as_deref().expect("validated"),
                config.secret_key.as_deref().expect("validated"),
            )
            .await?;
            info!(bucket, "using minio storage backend");
            Ok(Arc::new(store))
        }
        Backend::S3 => {
            let bucket = config.bucket.as_deref().expect("validated");
            let store = S3Store::new(
                bucket,
                config.region.as_deref().expect("validated"),
                config.access_key.as_deref().expect("validated"),
                config.secret_key.as_deref().expect("validated"),
            )
            .await?;
            info!(bucket, "using s3 storage backend");
            Ok(Arc::new(store))
        }
    }
}

/// Normalize an upload/listing prefix: strip one leading '/', ensure a
/// trailing '/' unless the prefix is empty.
pub(crate) fn normalize_prefix(prefix: &str) -> String {
    let prefix = prefix.strip_prefix('/').unwrap_or(prefix);
    if prefix.is_empty() || prefix.ends_with('/') {
        prefix.to_string()
    } else {
        format!("{prefix}/")
    }
}

/// The final path segment of a source file, required for upload destinations.
pub(crate) fn file_name(path: &Path) -> Result<String, StorageError> {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| {
            StorageError::InvalidKey(format!("[{}] has no file name", path.display()))
        })
}
