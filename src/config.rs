use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Which storage backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Filesystem,
    Minio,
    S3,
}

/// Backend selection plus the credentials and addressing needed to reach it.
/// Immutable after construction; which options are required depends on the
/// chosen backend.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: Backend,
    /// Root directory for the filesystem backend
    pub root_dir: String,
    /// Access key for the MinIO and S3 backends
    pub access_key: Option<String>,
    /// Secret key for the MinIO and S3 backends
    pub secret_key: Option<String>,
    /// Target bucket for the MinIO and S3 backends (auto-created if absent)
    pub bucket: Option<String>,
    /// MinIO server endpoint, e.g. http://localhost:9000
    pub endpoint: Option<String>,
    /// AWS region for the S3 backend
    pub region: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Filesystem,
            root_dir: "./data".to_string(),
            access_key: None,
            secret_key: None,
            bucket: None,
            endpoint: None,
            region: None,
        }
    }
}

impl StorageConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let backend = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "filesystem".to_string())
            .to_lowercase()
            .as_str()
        {
            "minio" => Backend::Minio,
            "s3" => Backend::S3,
            _ => Backend::Filesystem,
        };

        let root_dir = std::env::var("STORAGE_ROOT").unwrap_or_else(|_| "./data".to_string());

        let config = StorageConfig {
            backend,
            root_dir,
            access_key: std::env::var("STORAGE_ACCESS_KEY").ok(),
            secret_key: std::env::var("STORAGE_SECRET_KEY").ok(),
            bucket: std::env::var("STORAGE_BUCKET").ok(),
            endpoint: std::env::var("STORAGE_ENDPOINT").ok(),
            region: std::env::var("STORAGE_REGION").ok(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check that every option the selected backend needs is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.backend {
            Backend::Filesystem => {
                if self.root_dir.is_empty() {
                    return Err(ConfigError::ValidationError(
                        "STORAGE_ROOT cannot be empty".to_string(),
                    ));
                }
            }
            Backend::Minio => {
                self.require_remote_options()?;
                if self.endpoint.is_none() {
                    return Err(ConfigError::ValidationError(
                        "STORAGE_ENDPOINT is required when STORAGE_BACKEND=minio".to_string(),
                    ));
                }
            }
            Backend::S3 => {
                self.require_remote_options()?;
                if self.region.is_none() {
                    return Err(ConfigError::ValidationError(
                        "STORAGE_REGION is required when STORAGE_BACKEND=s3".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    fn require_remote_options(&self) -> Result<(), ConfigError> {
        if self.access_key.is_none() || self.secret_key.is_none() {
            return Err(ConfigError::ValidationError(
                "STORAGE_ACCESS_KEY and STORAGE_SECRET_KEY are required for remote backends"
                    .to_string(),
            ));
        }
        if self.bucket.is_none() {
            return Err(ConfigError::ValidationError(
                "STORAGE_BUCKET is required for remote backends".to_string(),
            ));
        }
        Ok(())
    }
}
