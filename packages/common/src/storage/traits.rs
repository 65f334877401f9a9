use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::error::StorageError;

/// Metadata the object store reports for a single object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    pub content_type: String,
    pub last_modified: DateTime<Utc>,
}

/// Key-addressed object storage.
///
/// Every call is a single network (or disk) round trip and may be cancelled
/// by dropping the returned future. Writes are full replacements of one object;
/// nothing is transactional across objects.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Create the backing container (bucket, root directory) if it is missing.
    ///
    /// Idempotent. Called once at startup.
    async fn ensure_container(&self) -> Result<(), StorageError>;

    /// Store `data` under `key`, replacing any existing object.
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError>;

    /// Retrieve all bytes of an object.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Retrieve size, content type and modification time of an object.
    async fn stat(&self, key: &str) -> Result<ObjectInfo, StorageError>;

    /// Delete an object.
    ///
    /// Returns `true` if the object was deleted, `false` if it did not exist.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// List every object whose key starts with `prefix`, recursively.
    ///
    /// Ordering is backend-defined.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StorageError>;

    /// Delete every object whose key starts with `prefix`.
    ///
    /// Objects are removed one at a time. If a delete fails, or the future is
    /// dropped part way, the objects already removed stay removed; a failure
    /// is reported as [`StorageError::PartialDelete`] once anything was
    /// deleted. Returns the number of objects removed.
    async fn delete_prefix(&self, prefix: &str) -> Result<usize, StorageError> {
        let objects = self.list(prefix).await?;
        let mut deleted = 0;

        for object in objects {
            match self.delete(&object.key).await {
                Ok(_) => deleted += 1,
                Err(e) if deleted == 0 => return Err(e),
                Err(e) => {
                    return Err(StorageError::PartialDelete {
                        prefix: prefix.to_string(),
                        deleted,
                        source: Box::new(e),
                    });
                }
            }
        }

        Ok(deleted)
    }
}

/// Reject keys that are empty, absolute, or contain `.`/`..` segments.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key is empty".into()));
    }
    if key.starts_with('/') || key.contains('\\') || key.contains('\0') {
        return Err(StorageError::InvalidKey(format!("{key:?} is not a relative key")));
    }
    if key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(StorageError::InvalidKey(format!(
            "{key:?} contains an empty or dot segment"
        )));
    }
    Ok(())
}
