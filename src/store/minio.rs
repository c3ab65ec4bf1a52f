use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::Duration;

use super::s3::ensure_bucket;
use super::{file_name, normalize_prefix, ObjectStorage, StorageError};

/// SigV4 maximum, and what MinIO hands out when no expiry is given.
const PRESIGNED_URL_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// MinIO backend. MinIO speaks the S3 wire protocol, so this is the same
/// client as [`super::S3Store`] pointed at an explicit endpoint with
/// path-style addressing; object URLs are presigned rather than public.
pub struct MinioStore {
    client: Client,
    bucket: String,
}

impl MinioStore {
    pub async fn new(
        bucket: &str,
        endpoint: &str,
        access_key: &str,
        secret_key: &str,
    ) -> Result<Self, anyhow::Error> {
        let credentials =
            aws_sdk_s3::config::Credentials::new(access_key, secret_key, None, None, "object-storage");
        // MinIO ignores the region but the SDK requires one
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new("us-east-1"))
            .endpoint_url(endpoint)
            .credentials_provider(credentials)
            .load()
            .await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();
        let client = Client::from_conf(s3_config);

        ensure_bucket(&client, bucket, None).await?;

        Ok(Self {
            client,
            bucket: bucket.to_string(),
        })
    }
}

#[async_trait]
impl ObjectStorage for MinioStore {
    async fn put_object(&self, data: Bytes, key: &str) -> Result<String, StorageError> {
        let content_type = mime_guess::from_path(key).first_or_octet_stream();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type.as_ref())
            .content_disposition("attachment")
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(key.to_string())
    }

    async fn upload_object(&self, file: &Path, dest_prefix: &str) -> Result<String, StorageError> {
        let key = format!("{}{}", normalize_prefix(dest_prefix), file_name(file)?);
        let data = tokio::fs::read(file).await?;
        self.put_object(Bytes::from(data), &key).await
    }

    async fn put_folder(&self, prefix: &str) -> Result<(), StorageError> {
        let marker = normalize_prefix(prefix);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&marker)
            .body(ByteStream::from_static(b""))
            .send()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn list_files(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let prefix = normalize_prefix(prefix);
        let mut keys = Vec::new();
        let mut continuation_token = None;
        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&prefix)
                .delimiter("/");
            if let Some(token) = continuation_token {
                request = request.continuation_token(token);
            }
            let resp = request
                .send()
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            for object in resp.contents() {
                if let Some(key) = object.key() {
                    if !key.ends_with('/') {
                        keys.push(key.to_string());
                    }
                }
            }
            continuation_token = resp.next_continuation_token().map(str::to_string);
            if continuation_token.is_none() {
                break;
            }
        }
        Ok(keys)
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, StorageError> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    StorageError::NotFound(key.to_string())
                } else {
                    StorageError::Backend(service_err.to_string())
                }
            })?;
        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(data.into_bytes())
    }

    async fn remove_object(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn remove_folder(&self, prefix: &str) -> Result<(), StorageError> {
        let prefix = normalize_prefix(prefix);
        let mut continuation_token = None;
        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&prefix);
            if let Some(token) = continuation_token {
                request = request.continuation_token(token);
            }
            let resp = request
                .send()
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            for object in resp.contents() {
                if let Some(key) = object.key() {
                    self.client
                        .delete_object()
                        .bucket(&self.bucket)
                        .key(key)
                        .send()
                        .await
                        .map_err(|e| StorageError::Backend(e.to_string()))?;
                }
            }
            continuation_token = resp.next_continuation_token().map(str::to_string);
            if continuation_token.is_none() {
                break;
            }
        }
        Ok(())
    }

    async fn object_url(&self, key: &str) -> Result<String, StorageError> {
        let presigning = PresigningConfig::expires_in(PRESIGNED_URL_TTL)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(presigned.uri().to_string())
    }

    async fn last_modified(&self, key: &str) -> Result<DateTime<Utc>, StorageError> {
        let resp = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    StorageError::NotFound(key.to_string())
                } else {
                    StorageError::Backend(service_err.to_string())
                }
            })?;
        let ts = resp.last_modified().ok_or_else(|| {
            StorageError::Backend(format!("no last-modified timestamp for [{key}]"))
        })?;
        DateTime::from_timestamp(ts.secs(), ts.subsec_nanos())
            .ok_or_else(|| StorageError::Backend(format!("timestamp out of range for [{key}]")))
    }
}
