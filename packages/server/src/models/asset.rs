use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::service::AssetInfo;
use crate::streaming::UploadReceipt;

/// Response DTO for a single asset.
#[derive(Serialize, utoipa::ToSchema)]
pub struct AssetResponse {
    #[schema(example = "figure1.png")]
    pub filename: String,
    /// Size in bytes.
    #[schema(example = 142857)]
    pub size: u64,
    #[schema(example = "image/png")]
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
}

impl From<AssetInfo> for AssetResponse {
    fn from(info: AssetInfo) -> Self {
        Self {
            filename: info.filename,
            size: info.size,
            content_type: info.content_type,
            uploaded_at: info.uploaded_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AssetListResponse {
    pub assets: Vec<AssetResponse>,
    pub total: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UploadAssetResponse {
    #[schema(example = "figure1.png")]
    pub filename: String,
    /// Bytes written.
    #[schema(example = 142857)]
    pub size: u64,
    pub success: bool,
}

impl From<UploadReceipt> for UploadAssetResponse {
    fn from(receipt: UploadReceipt) -> Self {
        Self {
            filename: receipt.filename,
            size: receipt.size,
            success: receipt.success,
        }
    }
}
