use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use super::{file_name, normalize_prefix, ObjectStorage, StorageError};

/// Local filesystem backend. Objects are plain files under the root
/// directory; folder prefixes are real directories.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, std::io::Error> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Resolve a key to its path under the root. Leading slashes are
    /// stripped (a key is a store-relative path, never an absolute one --
    /// `Path::join` would otherwise replace the root) and parent-directory
    /// components are rejected so no key can address anything outside the
    /// root.
    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let key = key.trim_start_matches('/');
        let escapes = Path::new(key)
            .components()
            .any(|c| matches!(c, Component::ParentDir));
        if escapes {
            return Err(StorageError::InvalidKey(format!(
                "[{key}] must not contain parent directory components"
            )));
        }
        Ok(self.root.join(key))
    }

    /// Keys must name a file, and files are told apart from folders by an
    /// extension in the final segment.
    fn validate_key(key: &str) -> Result<(), StorageError> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey(
                "key must not be empty".to_string(),
            ));
        }
        let name = key.rsplit('/').next().unwrap_or_default();
        if !name.contains('.') {
            return Err(StorageError::InvalidKey(format!(
                "[{key}] must end in a file name with an extension"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for FsStore {
    async fn put_object(&self, data: Bytes, key: &str) -> Result<String, StorageError> {
        Self::validate_key(key)?;
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &data).await?;
        Ok(key.to_string())
    }

    async fn upload_object(&self, file: &Path, dest_prefix: &str) -> Result<String, StorageError> {
        let key = format!("{}{}", normalize_prefix(dest_prefix), file_name(file)?);
        let data = tokio::fs::read(file).await?;
        self.put_object(Bytes::from(data), &key).await
    }

    async fn put_folder(&self, prefix: &str) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(self.object_path(prefix)?).await?;
        Ok(())
    }

    async fn list_files(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let dir = self.object_path(prefix)?;
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(StorageError::InvalidKey(format!(
                    "[{prefix}] is not a directory"
                )))
            }
            // A prefix with nothing under it lists as empty
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        }

        let base = normalize_prefix(prefix);
        let mut keys = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                keys.push(format!("{base}{}", entry.file_name().to_string_lossy()));
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, StorageError> {
        let path = self.object_path(key)?;
        if !path.exists() {
            return Err(StorageError::NotFound(key.to_string()));
        }
        let data = tokio::fs::read(&path).await?;
        Ok(Bytes::from(data))
    }

    async fn remove_object(&self, key: &str) -> Result<(), StorageError> {
        let path = self.object_path(key)?;
        if path.exists() {
            tokio::fs::remove_file(&path).await?;
        }
        Ok(())
    }

    async fn remove_folder(&self, prefix: &str) -> Result<(), StorageError> {
        match tokio::fs::remove_dir_all(self.object_path(prefix)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn object_url(&self, key: &str) -> Result<String, StorageError> {
        Ok(self.object_path(key)?.display().to_string())
    }

    async fn last_modified(&self, key: &str) -> Result<DateTime<Utc>, StorageError> {
        let path = self.object_path(key)?;
        let meta = tokio::fs::metadata(&path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StorageError::NotFound(key.to_string())
            } else {
                StorageError::Io(e)
            }
        })?;
        let modified = meta.modified()?;
        Ok(DateTime::<Utc>::from(modified))
    }
}
