use async_trait::async_trait;
use chrono::{DateTime, Utc};
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, BucketConfiguration, Region};

use super::error::StorageError;
use super::traits::{BlobStore, ObjectInfo, validate_key};
use crate::config::S3Config;

/// Object store backed by an S3-compatible service (MinIO, AWS S3, ...).
pub struct S3BlobStore {
    bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
    path_style: bool,
}

impl S3BlobStore {
    pub fn new(config: &S3Config) -> Result<Self, StorageError> {
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Backend(format!("invalid S3 credentials: {e}")))?;

        let mut bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())
            .map_err(backend)?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self {
            bucket,
            region,
            credentials,
            path_style: config.path_style,
        })
    }
}

fn backend(err: S3Error) -> StorageError {
    StorageError::Backend(err.to_string())
}

/// Map a failed request to `NotFound` on 404, `Backend` otherwise.
fn status_error(key: &str, status: u16, action: &str) -> StorageError {
    if status == 404 {
        StorageError::NotFound(key.to_string())
    } else {
        StorageError::Backend(format!("{action} {key} returned HTTP {status}"))
    }
}

fn request_error(key: &str, err: S3Error) -> StorageError {
    match err {
        S3Error::HttpFailWithBody(404, _) => StorageError::NotFound(key.to_string()),
        other => backend(other),
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

fn parse_rfc3339(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| {
            tracing::warn!("Unparseable object timestamp {:?}", raw);
            DateTime::<Utc>::UNIX_EPOCH
        })
}

fn parse_http_date(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc2822(raw)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| parse_rfc3339(raw))
}

fn guess_content_type(key: &str) -> String {
    mime_guess::from_path(key)
        .first_or_octet_stream()
        .to_string()
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn ensure_container(&self) -> Result<(), StorageError> {
        if self.bucket.exists().await.map_err(backend)? {
            return Ok(());
        }

        let name = self.bucket.name();
        let response = if self.path_style {
            Bucket::create_with_path_style(
                &name,
                self.region.clone(),
                self.credentials.clone(),
                BucketConfiguration::default(),
            )
            .await
        } else {
            Bucket::create(
                &name,
                self.region.clone(),
                self.credentials.clone(),
                BucketConfiguration::default(),
            )
            .await
        }
        .map_err(backend)?;

        // Another instance may have created it between the check and the create.
        if !response.success() && response.response_code != 409 {
            return Err(StorageError::Backend(format!(
                "create bucket {name} returned HTTP {}",
                response.response_code
            )));
        }

        tracing::info!("Created bucket {}", name);
        Ok(())
    }

    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        let response = self
            .bucket
            .put_object_with_content_type(key, data, content_type)
            .await
            .map_err(|e| request_error(key, e))?;
        if !is_success(response.status_code()) {
            return Err(status_error(key, response.status_code(), "put"));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        validate_key(key)?;
        let response = self
            .bucket
            .get_object(key)
            .await
            .map_err(|e| request_error(key, e))?;
        if !is_success(response.status_code()) {
            return Err(status_error(key, response.status_code(), "get"));
        }
        Ok(response.bytes().to_vec())
    }

    async fn stat(&self, key: &str) -> Result<ObjectInfo, StorageError> {
        validate_key(key)?;
        let (head, status) = self
            .bucket
            .head_object(key)
            .await
            .map_err(|e| request_error(key, e))?;
        if !is_success(status) {
            return Err(status_error(key, status, "head"));
        }

        Ok(ObjectInfo {
            key: key.to_string(),
            size: head.content_length.unwrap_or(0).max(0) as u64,
            content_type: head
                .content_type
                .unwrap_or_else(|| guess_content_type(key)),
            last_modified: head
                .last_modified
                .as_deref()
                .map(parse_http_date)
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        })
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        // S3 deletes are idempotent and do not say whether the key existed.
        let existed = match self.stat(key).await {
            Ok(_) => true,
            Err(StorageError::NotFound(_)) => false,
            Err(e) => return Err(e),
        };

        let response = self
            .bucket
            .delete_object(key)
            .await
            .map_err(|e| request_error(key, e))?;
        let status = response.status_code();
        if !is_success(status) && status != 404 {
            return Err(status_error(key, status, "delete"));
        }
        Ok(existed)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StorageError> {
        let pages = self
            .bucket
            .list(prefix.to_string(), None)
            .await
            .map_err(backend)?;

        // Listing does not carry content types; derive them from the key.
        Ok(pages
            .into_iter()
            .flat_map(|page| page.contents)
            .map(|object| ObjectInfo {
                content_type: guess_content_type(&object.key),
                size: object.size,
                last_modified: parse_rfc3339(&object.last_modified),
                key: object.key,
            })
            .collect())
    }
}
