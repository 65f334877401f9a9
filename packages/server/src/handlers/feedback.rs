use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::instrument;

use super::owned_feedback;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::feedback::*;
use crate::models::shared::{Pagination, validate_title};
use crate::service::{CreateFeedback, DEFAULT_PER_PAGE, ListFeedback, MAX_PER_PAGE};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/",
    tag = "Feedback",
    operation_id = "createFeedback",
    summary = "Create a feedback document",
    description = "Stores the markdown body in the blob store and the metadata in the database. \
        The caller becomes the owner.",
    request_body = CreateFeedbackRequest,
    responses(
        (status = 201, description = "Feedback created", body = FeedbackResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (IDENTITY_MISSING, IDENTITY_INVALID)", body = ErrorBody),
    ),
    security(("user_id" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, lab_id = payload.lab_id))]
pub async fn create_feedback(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateFeedbackRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_title(&payload.title)?;

    let doc = state
        .feedback
        .create_feedback(CreateFeedback {
            owner_id: auth_user.user_id,
            lab_id: payload.lab_id,
            title: payload.title.trim().to_string(),
            content: payload.content,
        })
        .await?;

    Ok((StatusCode::CREATED, AppJson(FeedbackResponse::from(doc))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Feedback",
    operation_id = "listFeedback",
    summary = "List the caller's feedback documents",
    description = "Newest first. Bodies are not included; fetch a document to read its content.",
    params(FeedbackListQuery),
    responses(
        (status = 200, description = "Page of feedback documents", body = FeedbackListResponse),
        (status = 401, description = "Unauthorized (IDENTITY_MISSING, IDENTITY_INVALID)", body = ErrorBody),
    ),
    security(("user_id" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_feedback(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<FeedbackListQuery>,
) -> Result<AppJson<FeedbackListResponse>, AppError> {
    let page = Ord::max(query.page.unwrap_or(1), 1);
    let per_page = query.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);

    let result = state
        .feedback
        .list_feedback(ListFeedback {
            owner_id: auth_user.user_id,
            lab_id: query.lab_id,
            page,
            per_page,
        })
        .await?;

    Ok(AppJson(FeedbackListResponse {
        data: result.records.into_iter().map(FeedbackSummary::from).collect(),
        pagination: Pagination::new(result.page, result.per_page, result.total),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Feedback",
    operation_id = "getFeedback",
    summary = "Get a feedback document",
    params(("id" = String, Path, description = "Feedback ID (UUID)")),
    responses(
        (status = 200, description = "Feedback document", body = FeedbackResponse),
        (status = 401, description = "Unauthorized (IDENTITY_MISSING, IDENTITY_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Feedback not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("user_id" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn get_feedback(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<AppJson<FeedbackResponse>, AppError> {
    let record = owned_feedback(&state, &auth_user, &id).await?;
    let doc = state.feedback.get_feedback(record.id).await?;
    Ok(AppJson(FeedbackResponse::from(doc)))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Feedback",
    operation_id = "updateFeedback",
    summary = "Update a feedback document",
    description = "Absent or empty `title`/`content` leave the stored value unchanged. The content \
        hash is recomputed when the body changes. Set `expected_updated_at` to reject the update \
        if someone else modified the document first.",
    params(("id" = String, Path, description = "Feedback ID (UUID)")),
    request_body = UpdateFeedbackRequest,
    responses(
        (status = 200, description = "Updated feedback document", body = FeedbackResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (IDENTITY_MISSING, IDENTITY_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Feedback not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Modified concurrently (CONFLICT)", body = ErrorBody),
    ),
    security(("user_id" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn update_feedback(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UpdateFeedbackRequest>,
) -> Result<AppJson<FeedbackResponse>, AppError> {
    let patch = payload.into_patch()?;
    let record = owned_feedback(&state, &auth_user, &id).await?;
    let doc = state.feedback.update_feedback(record.id, patch).await?;
    Ok(AppJson(FeedbackResponse::from(doc)))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Feedback",
    operation_id = "deleteFeedback",
    summary = "Delete a feedback document and all its assets",
    description = "Removes the body and every asset first, then the metadata. If removing objects \
        fails the document stays readable and the request can be retried.",
    params(("id" = String, Path, description = "Feedback ID (UUID)")),
    responses(
        (status = 204, description = "Feedback deleted"),
        (status = 401, description = "Unauthorized (IDENTITY_MISSING, IDENTITY_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Feedback not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("user_id" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn delete_feedback(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let record = owned_feedback(&state, &auth_user, &id).await?;
    state.feedback.delete_feedback(record.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
