use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;

/// Header carrying the caller's user id, set by the upstream gateway after
/// it has authenticated the request.
pub const USER_ID_HEADER: &str = "X-User-ID";

/// Caller identity extracted from the [`USER_ID_HEADER`] header.
///
/// Add this as a handler parameter to require an identified caller.
/// Ownership checks happen via `require_owner()` in the handler body.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: i64,
}

impl AuthUser {
    /// Returns `Ok(())` if the caller is `owner_id`, `Err(PermissionDenied)` otherwise.
    pub fn require_owner(&self, owner_id: i64) -> Result<(), AppError> {
        if self.user_id == owner_id {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::IdentityMissing)?;

        let user_id = raw
            .trim()
            .parse::<i64>()
            .map_err(|_| AppError::IdentityInvalid)?;

        Ok(AuthUser { user_id })
    }
}
