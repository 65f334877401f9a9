use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use super::error::StorageError;
use super::traits::{BlobStore, ObjectInfo, validate_key};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Sidecar record kept next to each object.
#[derive(Serialize, Deserialize)]
struct ObjectMeta {
    content_type: String,
}

/// Filesystem-backed object store.
///
/// Layout under `base_path`:
/// - `objects/{key}`: object bytes
/// - `meta/{key}.json`: content type sidecar
/// - `.tmp/`: staging area, renamed into place so readers never see a
///   partially written object
pub struct FilesystemBlobStore {
    base_path: PathBuf,
}

impl FilesystemBlobStore {
    /// Create a new filesystem blob store. Directories are created by
    /// [`BlobStore::ensure_container`].
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn objects_root(&self) -> PathBuf {
        self.base_path.join("objects")
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.objects_root().join(key)
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.base_path.join("meta").join(format!("{key}.json"))
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }

    /// Write `data` to a temp file, then rename it over `dest`.
    async fn write_atomic(&self, dest: &Path, data: &[u8]) -> Result<(), StorageError> {
        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, dest).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(())
    }

    async fn content_type_of(&self, key: &str) -> String {
        match fs::read(self.meta_path(key)).await {
            Ok(raw) => match serde_json::from_slice::<ObjectMeta>(&raw) {
                Ok(meta) => meta.content_type,
                Err(e) => {
                    tracing::warn!(key, "Ignoring unreadable object sidecar: {}", e);
                    guess_content_type(key)
                }
            },
            Err(_) => guess_content_type(key),
        }
    }

    async fn info_for(&self, key: &str, meta: std::fs::Metadata) -> Result<ObjectInfo, StorageError> {
        let last_modified: DateTime<Utc> = meta.modified()?.into();
        Ok(ObjectInfo {
            key: key.to_string(),
            size: meta.len(),
            content_type: self.content_type_of(key).await,
            last_modified,
        })
    }
}

fn guess_content_type(key: &str) -> String {
    mime_guess::from_path(key)
        .first()
        .map(|m| m.to_string())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
}

fn not_found_or(key: &str, e: std::io::Error) -> StorageError {
    if e.kind() == std::io::ErrorKind::NotFound {
        StorageError::NotFound(key.to_string())
    } else {
        e.into()
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn ensure_container(&self) -> Result<(), StorageError> {
        fs::create_dir_all(self.objects_root()).await?;
        fs::create_dir_all(self.base_path.join("meta")).await?;
        fs::create_dir_all(self.base_path.join(".tmp")).await?;
        Ok(())
    }

    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError> {
        validate_key(key)?;

        let meta = serde_json::to_vec(&ObjectMeta {
            content_type: content_type.to_string(),
        })
        .map_err(|e| StorageError::Backend(format!("sidecar encode failed: {e}")))?;

        self.write_atomic(&self.meta_path(key), &meta).await?;
        self.write_atomic(&self.object_path(key), data).await
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        validate_key(key)?;
        fs::read(self.object_path(key))
            .await
            .map_err(|e| not_found_or(key, e))
    }

    async fn stat(&self, key: &str) -> Result<ObjectInfo, StorageError> {
        validate_key(key)?;
        let meta = fs::metadata(self.object_path(key))
            .await
            .map_err(|e| not_found_or(key, e))?;
        if !meta.is_file() {
            return Err(StorageError::NotFound(key.to_string()));
        }
        self.info_for(key, meta).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        let removed = match fs::remove_file(self.object_path(key)).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };

        // Stale sidecars are harmless; the object file is authoritative.
        let _ = fs::remove_file(self.meta_path(key)).await;

        Ok(removed)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StorageError> {
        // Only walk the deepest directory the prefix pins down.
        let dir = match prefix.rfind('/') {
            Some(idx) => {
                let dir = &prefix[..idx];
                validate_key(dir)?;
                dir
            }
            None => "",
        };

        let root = self.objects_root();
        let mut pending = vec![root.join(dir)];
        let mut objects = Vec::new();

        while let Some(current) = pending.pop() {
            let mut entries = match fs::read_dir(&current).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let meta = entry.metadata().await?;
                let path = entry.path();
                if meta.is_dir() {
                    pending.push(path);
                    continue;
                }

                let Some(key) = relative_key(&root, &path) else {
                    continue;
                };
                if key.starts_with(prefix) {
                    objects.push(self.info_for(&key, meta).await?);
                }
            }
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }
}

/// Convert an absolute object path back into a `/`-separated key.
fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Option<Vec<&str>> = relative.iter().map(|s| s.to_str()).collect();
    Some(segments?.join("/"))
}
