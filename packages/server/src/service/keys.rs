//! Blob-store key layout of a feedback document:
//!
//! ```text
//! {id}/content.md
//! {id}/assets/{filename}
//! ```

use uuid::Uuid;

pub const CONTENT_FILE: &str = "content.md";

pub fn document_prefix(id: Uuid) -> String {
    format!("{id}/")
}

pub fn content_key(id: Uuid) -> String {
    format!("{id}/{CONTENT_FILE}")
}

pub fn assets_prefix(id: Uuid) -> String {
    format!("{id}/assets/")
}

pub fn asset_key(id: Uuid, filename: &str) -> String {
    format!("{id}/assets/{filename}")
}
