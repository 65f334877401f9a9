use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::service::FeedbackError;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`,
    /// `PROTOCOL_VIOLATION`, `IDENTITY_MISSING`, `IDENTITY_INVALID`,
    /// `PERMISSION_DENIED`, `NOT_FOUND`, `CONFLICT`, `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Title must be 1-256 characters")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    ProtocolViolation(String),
    IdentityMissing,
    IdentityInvalid,
    PermissionDenied,
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::ProtocolViolation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "PROTOCOL_VIOLATION",
                    message: msg,
                },
            ),
            AppError::IdentityMissing => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "IDENTITY_MISSING",
                    message: "Authentication required".into(),
                },
            ),
            AppError::IdentityInvalid => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "IDENTITY_INVALID",
                    message: "Invalid user identity".into(),
                },
            ),
            AppError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    code: "PERMISSION_DENIED",
                    message: "Insufficient permissions".into(),
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "CONFLICT",
                    message: msg,
                },
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<FeedbackError> for AppError {
    fn from(err: FeedbackError) -> Self {
        match err {
            FeedbackError::NotFound(detail) => {
                tracing::debug!("Not found: {detail}");
                AppError::NotFound("Feedback or asset not found".into())
            }
            FeedbackError::Conflict(detail) => AppError::Conflict(detail),
            FeedbackError::ProtocolViolation(detail) => AppError::ProtocolViolation(detail),
            FeedbackError::InvalidArgument(detail) => AppError::Validation(detail),
            other @ (FeedbackError::StorageWriteFailed { .. }
            | FeedbackError::StorageReadFailed { .. }
            | FeedbackError::CompensationFailed { .. }) => AppError::Internal(other.to_string()),
        }
    }
}
