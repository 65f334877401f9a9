use common::storage::StorageError;
use thiserror::Error;

use crate::repository::MetadataError;

/// The underlying failure of one of the two stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Blob(#[from] StorageError),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Metadata(e) => matches!(e, MetadataError::NotFound(_)),
            Self::Blob(e) => e.is_not_found(),
        }
    }

    fn is_stale(&self) -> bool {
        matches!(self, Self::Metadata(MetadataError::Stale(_)))
    }
}

#[derive(Debug, Error)]
pub enum FeedbackError {
    /// The referenced document or asset is absent from the queried store.
    #[error("not found: {0}")]
    NotFound(String),

    /// A conditional update lost against a concurrent writer.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{context}: {source}")]
    StorageWriteFailed {
        context: String,
        #[source]
        source: StoreError,
    },

    #[error("{context}: {source}")]
    StorageReadFailed {
        context: String,
        #[source]
        source: StoreError,
    },

    /// A write failed and so did the compensating action that should have
    /// undone the preceding step. The stores disagree until repaired.
    #[error("{context}: {source}; compensation failed: {compensation}")]
    CompensationFailed {
        context: String,
        #[source]
        source: StoreError,
        compensation: StoreError,
    },

    /// Malformed upload stream.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl FeedbackError {
    pub(crate) fn read(context: impl Into<String>, source: impl Into<StoreError>) -> Self {
        let context = context.into();
        let source = source.into();
        if source.is_not_found() {
            Self::NotFound(format!("{context}: {source}"))
        } else {
            Self::StorageReadFailed { context, source }
        }
    }

    pub(crate) fn write(context: impl Into<String>, source: impl Into<StoreError>) -> Self {
        let context = context.into();
        let source = source.into();
        if source.is_not_found() {
            Self::NotFound(format!("{context}: {source}"))
        } else if source.is_stale() {
            Self::Conflict(format!("{context}: {source}"))
        } else {
            Self::StorageWriteFailed { context, source }
        }
    }
}
