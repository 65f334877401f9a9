use std::convert::Infallible;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use futures::{StreamExt, TryStreamExt, future, stream};
use tracing::instrument;

use super::owned_feedback;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::asset::{AssetListResponse, AssetResponse, UploadAssetResponse};
use crate::state::AppState;
use crate::streaming::{DownloadFrame, UploadFrame, UploadMetadata};
use crate::utils::filename::content_disposition_value;

/// `Last-Modified` uses the IMF-fixdate form.
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

#[utoipa::path(
    put,
    path = "/{id}/assets/{filename}",
    tag = "Feedback Assets",
    operation_id = "uploadAsset",
    summary = "Upload an asset",
    description = "Streams the raw request body into an asset of the document. Re-uploading the \
        same filename replaces the previous asset. `Content-Type` defaults to a guess from the \
        filename; `Content-Length`, when present, is only used as a sizing hint.",
    params(
        ("id" = String, Path, description = "Feedback ID (UUID)"),
        ("filename" = String, Path, description = "Asset filename"),
    ),
    request_body(content_type = "application/octet-stream", description = "Asset bytes"),
    responses(
        (status = 201, description = "Asset stored", body = UploadAssetResponse),
        (status = 400, description = "Invalid filename or upload (VALIDATION_ERROR, PROTOCOL_VIOLATION)", body = ErrorBody),
        (status = 401, description = "Unauthorized (IDENTITY_MISSING, IDENTITY_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Feedback not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("user_id" = [])),
)]
#[instrument(skip(state, auth_user, headers, body), fields(user_id = auth_user.user_id))]
pub async fn upload_asset(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, filename)): Path<(String, String)>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse, AppError> {
    let record = owned_feedback(&state, &auth_user, &id).await?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| {
            mime_guess::from_path(&filename)
                .first_or_octet_stream()
                .to_string()
        });
    let total_size = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);

    let metadata = UploadFrame::Metadata(UploadMetadata {
        feedback_id: record.id,
        filename,
        content_type,
        total_size,
    });
    let frames = stream::once(future::ready(Ok::<_, axum::Error>(metadata)))
        .chain(body.into_data_stream().map_ok(UploadFrame::Chunk));

    let receipt = state.assets.receive_upload(frames).await?;

    Ok((
        StatusCode::CREATED,
        AppJson(UploadAssetResponse::from(receipt)),
    ))
}

#[utoipa::path(
    get,
    path = "/{id}/assets/{filename}",
    tag = "Feedback Assets",
    operation_id = "downloadAsset",
    summary = "Download an asset",
    description = "Streams the asset in fixed-size chunks.",
    params(
        ("id" = String, Path, description = "Feedback ID (UUID)"),
        ("filename" = String, Path, description = "Asset filename"),
    ),
    responses(
        (status = 200, description = "Asset content"),
        (status = 401, description = "Unauthorized (IDENTITY_MISSING, IDENTITY_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Feedback or asset not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("user_id" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn download_asset(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, filename)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let record = owned_feedback(&state, &auth_user, &id).await?;

    let mut frames = state.assets.download_frames(record.id, &filename).await?;
    let Some(DownloadFrame::Info(info)) = frames.next().await else {
        return Err(AppError::Internal(
            "Download stream did not start with asset info".into(),
        ));
    };

    let chunks = frames.filter_map(|frame| {
        future::ready(match frame {
            DownloadFrame::Chunk(bytes) => Some(Ok::<_, Infallible>(bytes)),
            DownloadFrame::Info(_) => None,
        })
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, &info.content_type)
        .header(header::CONTENT_LENGTH, info.size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(&info.filename),
        )
        .header(
            header::LAST_MODIFIED,
            info.uploaded_at.format(HTTP_DATE_FORMAT).to_string(),
        )
        .header(header::CACHE_CONTROL, "private, no-cache")
        .body(Body::from_stream(chunks))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

#[utoipa::path(
    get,
    path = "/{id}/assets",
    tag = "Feedback Assets",
    operation_id = "listAssets",
    summary = "List the assets of a feedback document",
    params(("id" = String, Path, description = "Feedback ID (UUID)")),
    responses(
        (status = 200, description = "Assets sorted by filename", body = AssetListResponse),
        (status = 401, description = "Unauthorized (IDENTITY_MISSING, IDENTITY_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Feedback not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("user_id" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_assets(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<AppJson<AssetListResponse>, AppError> {
    let record = owned_feedback(&state, &auth_user, &id).await?;

    let assets = state.feedback.list_assets(record.id).await?;
    let total = assets.len() as u64;

    Ok(AppJson(AssetListResponse {
        assets: assets.into_iter().map(AssetResponse::from).collect(),
        total,
    }))
}

#[utoipa::path(
    delete,
    path = "/{id}/assets/{filename}",
    tag = "Feedback Assets",
    operation_id = "deleteAsset",
    summary = "Delete an asset",
    params(
        ("id" = String, Path, description = "Feedback ID (UUID)"),
        ("filename" = String, Path, description = "Asset filename"),
    ),
    responses(
        (status = 204, description = "Asset deleted"),
        (status = 401, description = "Unauthorized (IDENTITY_MISSING, IDENTITY_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Feedback or asset not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("user_id" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn delete_asset(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, filename)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let record = owned_feedback(&state, &auth_user, &id).await?;
    state.feedback.delete_asset(record.id, &filename).await?;
    Ok(StatusCode::NO_CONTENT)
}
