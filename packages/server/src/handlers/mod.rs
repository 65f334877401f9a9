pub mod asset;
pub mod feedback;

use uuid::Uuid;

use crate::entity::feedback_file;
use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::state::AppState;

fn parse_feedback_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::Validation("Invalid feedback ID".into()))
}

/// Load the metadata of `raw_id` and check that the caller owns it.
async fn owned_feedback(
    state: &AppState,
    auth_user: &AuthUser,
    raw_id: &str,
) -> Result<feedback_file::Model, AppError> {
    let id = parse_feedback_id(raw_id)?;
    let record = state.feedback.feedback_metadata(id).await?;
    auth_user.require_owner(record.owner_id)?;
    Ok(record)
}
