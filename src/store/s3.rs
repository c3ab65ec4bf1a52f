use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::info;

use super::{file_name, normalize_prefix, ObjectStorage, StorageError};

/// AWS S3 backend.
pub struct S3Store {
    client: Client,
    bucket: String,
    region: String,
}

impl S3Store {
    pub async fn new(
        bucket: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
    ) -> Result<Self, anyhow::Error> {
        let credentials =
            aws_sdk_s3::config::Credentials::new(access_key, secret_key, None, None, "object-storage");
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .credentials_provider(credentials)
            .load()
            .await;
        let client = Client::new(&sdk_config);

        ensure_bucket(&client, bucket, Some(region)).await?;

        Ok(Self {
            client,
            bucket: bucket.to_string(),
            region: region.to_string(),
        })
    }
}

/// Create the target bucket if it does not exist yet. Runs once per backend
/// construction; any failure here is fatal.
pub(crate) async fn ensure_bucket(
    client: &Client,
    bucket: &str,
    region: Option<&str>,
) -> Result<(), anyhow::Error> {
    match client.head_bucket().bucket(bucket).send().await {
        Ok(_) => return Ok(()),
        Err(err) => {
            let service_err = err.into_service_error();
            if !service_err.is_not_found() {
                return Err(anyhow::anyhow!(
                    "failed to check bucket [{bucket}]: {service_err}"
                ));
            }
        }
    }

    let mut request = client.create_bucket().bucket(bucket);
    // us-east-1 is the S3 default and rejects an explicit location constraint
    if let Some(region) = region.filter(|r| *r != "us-east-1") {
        request = request.create_bucket_configuration(
            CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(region))
                .build(),
        );
    }
    request
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("failed to create bucket [{bucket}]: {e}"))?;

    info!(bucket, "bucket successfully created");
    Ok(())
}

#[async_trait]
impl ObjectStorage for S3Store {
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
        // The marker carries a trailing '/' so listings can tell it apart
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
        // S3 DeleteObject succeeds on a missing key
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
        Ok(format!(
            "https://{}.s3.{}.amazonaws.com/{key}",
            self.bucket, self.region
        ))
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
