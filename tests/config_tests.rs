use bytes::Bytes;
use object_storage::{from_config, Backend, StorageConfig};

#[test]
fn test_default_config_is_filesystem() {
    let config = StorageConfig::default();
    assert_eq!(config.backend, Backend::Filesystem);
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_reads_environment() {
    // The only env-touching test in the suite; vars are scoped to it so
    // parallel tests never observe them.
    let vars = [
        ("STORAGE_BACKEND", "s3"),
        ("STORAGE_ROOT", "/srv/objects"),
        ("STORAGE_ACCESS_KEY", "AKIA"),
        ("STORAGE_SECRET_KEY", "secret"),
        ("STORAGE_BUCKET", "store"),
        ("STORAGE_REGION", "eu-west-3"),
    ];
    for (key, value) in vars {
        std::env::set_var(key, value);
    }
    let loaded = StorageConfig::load();
    for (key, _) in vars {
        std::env::remove_var(key);
    }

    let config = loaded.unwrap();
    assert_eq!(config.backend, Backend::S3);
    assert_eq!(config.root_dir, "/srv/objects");
    assert_eq!(config.access_key.as_deref(), Some("AKIA"));
    assert_eq!(config.secret_key.as_deref(), Some("secret"));
    assert_eq!(config.bucket.as_deref(), Some("store"));
    assert_eq!(config.region.as_deref(), Some("eu-west-3"));

    // With the environment cleared again, load falls back to the
    // filesystem backend and its default root
    let config = StorageConfig::load().unwrap();
    assert_eq!(config.backend, Backend::Filesystem);
    assert_eq!(config.root_dir, "./data");
}

#[test]
fn test_minio_requires_endpoint() {
    let config = StorageConfig {
        backend: Backend::Minio,
        access_key: Some("minioadmin".to_string()),
        secret_key: Some("minioadmin".to_string()),
        bucket: Some("store".to_string()),
        ..Default::default()
    };
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("STORAGE_ENDPOINT"));
}

#[test]
fn test_s3_requires_region() {
    let config = StorageConfig {
        backend: Backend::S3,
        access_key: Some("AKIA".to_string()),
        secret_key: Some("secret".to_string()),
        bucket: Some("store".to_string()),
        ..Default::default()
    };
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("STORAGE_REGION"));
}

#[test]
fn test_remote_requires_credentials_and_bucket() {
    let config = StorageConfig {
        backend: Backend::S3,
        region: Some("eu-west-3".to_string()),
        ..Default::default()
    };
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("STORAGE_ACCESS_KEY"));

    let config = StorageConfig {
        backend: Backend::Minio,
        endpoint: Some("http://localhost:9000".to_string()),
        access_key: Some("minioadmin".to_string()),
        secret_key: Some("minioadmin".to_string()),
        ..Default::default()
    };
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("STORAGE_BUCKET"));
}

#[test]
fn test_complete_remote_configs_validate() {
    let config = StorageConfig {
        backend: Backend::Minio,
        access_key: Some("minioadmin".to_string()),
        secret_key: Some("minioadmin".to_string()),
        bucket: Some("store".to_string()),
        endpoint: Some("http://localhost:9000".to_string()),
        ..Default::default()
    };
    assert!(config.validate().is_ok());

    let config = StorageConfig {
        backend: Backend::S3,
        access_key: Some("AKIA".to_string()),
        secret_key: Some("secret".to_string()),
        bucket: Some("store".to_string()),
        region: Some("eu-west-3".to_string()),
        ..Default::default()
    };
    assert!(config.validate().is_ok());
}

#[tokio::test]
async fn test_from_config_builds_filesystem_backend() {
    let dir = tempfile::tempdir().unwrap();
    let config = StorageConfig {
        root_dir: dir.path().display().to_string(),
        ..Default::default()
    };

    // Exercised through the trait object, as callers would
    let store = from_config(&config).await.unwrap();
    let key = store
        .put_object(Bytes::from("via trait"), "t/obj.txt")
        .await
        .unwrap();
    assert_eq!(store.get_object(&key).await.unwrap(), Bytes::from("via trait"));
}

#[tokio::test]
async fn test_from_config_rejects_invalid_config() {
    let config = StorageConfig {
        backend: Backend::Minio,
        ..Default::default()
    };
    assert!(from_config(&config).await.is_err());
}
