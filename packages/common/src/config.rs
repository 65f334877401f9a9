use std::path::PathBuf;

use serde::Deserialize;

/// Which blob store backend to construct at startup.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Filesystem,
    S3,
}

/// App-level blob storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Backend selector. Default: "filesystem".
    #[serde(default)]
    pub backend: StorageBackend,
    /// Largest single asset accepted by the upload stream, in bytes. Default: 128 MiB.
    #[serde(default = "default_max_asset_size")]
    pub max_asset_size: u64,
    #[serde(default)]
    pub filesystem: FilesystemConfig,
    #[serde(default)]
    pub s3: S3Config,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilesystemConfig {
    /// Root directory for objects. Default: "./data/blobs".
    #[serde(default = "default_fs_root")]
    pub root: PathBuf,
}

/// S3-compatible object storage (MinIO, AWS, ...).
#[derive(Debug, Deserialize, Clone)]
pub struct S3Config {
    /// Default: "http://localhost:9000".
    #[serde(default = "default_s3_endpoint")]
    pub endpoint: String,
    /// Default: "us-east-1".
    #[serde(default = "default_s3_region")]
    pub region: String,
    /// Default: "feedback-bucket".
    #[serde(default = "default_s3_bucket")]
    pub bucket: String,
    #[serde(default = "default_s3_access_key")]
    pub access_key: String,
    #[serde(default = "default_s3_secret_key")]
    pub secret_key: String,
    /// Use path-style addressing (required by MinIO). Default: true.
    #[serde(default = "default_path_style")]
    pub path_style: bool,
}

fn default_max_asset_size() -> u64 {
    128 * 1024 * 1024
}
fn default_fs_root() -> PathBuf {
    PathBuf::from("./data/blobs")
}
fn default_s3_endpoint() -> String {
    "http://localhost:9000".into()
}
fn default_s3_region() -> String {
    "us-east-1".into()
}
fn default_s3_bucket() -> String {
    "feedback-bucket".into()
}
fn default_s3_access_key() -> String {
    "minioadmin".into()
}
fn default_s3_secret_key() -> String {
    "minioadmin".into()
}
fn default_path_style() -> bool {
    true
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            root: default_fs_root(),
        }
    }
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            endpoint: default_s3_endpoint(),
            region: default_s3_region(),
            bucket: default_s3_bucket(),
            access_key: default_s3_access_key(),
            secret_key: default_s3_secret_key(),
            path_style: default_path_style(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            max_asset_size: default_max_asset_size(),
            filesystem: FilesystemConfig::default(),
            s3: S3Config::default(),
        }
    }
}
