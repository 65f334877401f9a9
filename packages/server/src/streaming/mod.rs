//! Chunked asset transfer on top of [`FeedbackService`].
//!
//! Uploads arrive as an ordered stream of frames: one metadata frame, then
//! raw chunks. Downloads leave as one info frame followed by chunks of at
//! most [`CHUNK_SIZE`] bytes. The transport decides how frames travel.

use std::fmt;
use std::sync::Arc;

use axum::body::Bytes;
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::service::{AssetInfo, FeedbackError, FeedbackService};

/// Size of download chunks.
pub const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct UploadMetadata {
    pub feedback_id: Uuid,
    pub filename: String,
    pub content_type: String,
    /// Announced payload size. Only used to pre-size the receive buffer.
    pub total_size: u64,
}

#[derive(Debug, Clone)]
pub enum UploadFrame {
    Metadata(UploadMetadata),
    Chunk(Bytes),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReceipt {
    pub filename: String,
    pub size: u64,
    pub success: bool,
}

#[derive(Debug, Clone)]
pub enum DownloadFrame {
    Info(AssetInfo),
    Chunk(Bytes),
}

enum UploadState {
    AwaitingMetadata,
    ReceivingChunks {
        metadata: UploadMetadata,
        buffer: Vec<u8>,
    },
}

pub struct AssetStreamer {
    service: Arc<dyn FeedbackService>,
    max_asset_size: u64,
}

impl AssetStreamer {
    pub fn new(service: Arc<dyn FeedbackService>, max_asset_size: u64) -> Self {
        Self {
            service,
            max_asset_size,
        }
    }

    /// Consume an upload stream and store the assembled asset once the
    /// stream ends cleanly.
    ///
    /// Nothing is written unless the whole stream was received. A transport
    /// error, a missing or repeated metadata frame, or a payload above the
    /// size limit aborts the upload.
    #[instrument(skip_all)]
    pub async fn receive_upload<S, E>(&self, frames: S) -> Result<UploadReceipt, FeedbackError>
    where
        S: Stream<Item = Result<UploadFrame, E>> + Send,
        E: fmt::Display,
    {
        let mut frames = std::pin::pin!(frames);
        let mut state = UploadState::AwaitingMetadata;

        while let Some(frame) = frames.next().await {
            let frame = frame.map_err(|e| {
                tracing::warn!("Upload stream interrupted: {}", e);
                FeedbackError::ProtocolViolation(format!("upload stream interrupted: {e}"))
            })?;

            state = match (state, frame) {
                (UploadState::AwaitingMetadata, UploadFrame::Metadata(metadata)) => {
                    let capacity = metadata.total_size.min(self.max_asset_size);
                    tracing::debug!(
                        feedback_id = %metadata.feedback_id,
                        filename = %metadata.filename,
                        total_size = metadata.total_size,
                        "Receiving upload"
                    );
                    UploadState::ReceivingChunks {
                        metadata,
                        buffer: Vec::with_capacity(usize::try_from(capacity).unwrap_or(0)),
                    }
                }
                (UploadState::AwaitingMetadata, UploadFrame::Chunk(_)) => {
                    return Err(FeedbackError::ProtocolViolation(
                        "first frame must be metadata".into(),
                    ));
                }
                (UploadState::ReceivingChunks { .. }, UploadFrame::Metadata(_)) => {
                    return Err(FeedbackError::ProtocolViolation(
                        "metadata frame sent twice".into(),
                    ));
                }
                (UploadState::ReceivingChunks { metadata, mut buffer }, UploadFrame::Chunk(chunk)) => {
                    if (buffer.len() + chunk.len()) as u64 > self.max_asset_size {
                        return Err(FeedbackError::ProtocolViolation(format!(
                            "asset exceeds the maximum size of {} bytes",
                            self.max_asset_size
                        )));
                    }
                    buffer.extend_from_slice(&chunk);
                    UploadState::ReceivingChunks { metadata, buffer }
                }
            };
        }

        let UploadState::ReceivingChunks { metadata, buffer } = state else {
            return Err(FeedbackError::ProtocolViolation(
                "stream ended before metadata".into(),
            ));
        };

        let size = self
            .service
            .upload_asset(
                metadata.feedback_id,
                &metadata.filename,
                &metadata.content_type,
                &buffer,
            )
            .await?;

        Ok(UploadReceipt {
            filename: metadata.filename,
            size,
            success: true,
        })
    }

    /// Fetch an asset and lay it out as an info frame followed by chunks.
    /// An empty asset yields the info frame only.
    #[instrument(skip(self))]
    pub async fn download_frames(
        &self,
        feedback_id: Uuid,
        filename: &str,
    ) -> Result<BoxStream<'static, DownloadFrame>, FeedbackError> {
        let (info, data) = self.service.download_asset(feedback_id, filename).await?;
        let chunks = chunked(Bytes::from(data)).map(DownloadFrame::Chunk);

        Ok(stream::once(async move { DownloadFrame::Info(info) })
            .chain(stream::iter(chunks))
            .boxed())
    }
}

/// Zero-copy split into [`CHUNK_SIZE`] slices; the last may be shorter.
fn chunked(data: Bytes) -> impl Iterator<Item = Bytes> + Send + 'static {
    (0..data.len())
        .step_by(CHUNK_SIZE)
        .map(move |start| data.slice(start..(start + CHUNK_SIZE).min(data.len())))
}
