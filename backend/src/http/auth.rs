//! Bearer-token authentication and role guards.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::error::AppError;
use super::state::AppState;
use crate::models::{User, UserId, UserRole};
use crate::services::auth;

/// The caller behind `Authorization: Bearer <token>`.
///
/// Rejects with 401 when the header is missing or the session is unknown or
/// expired.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub token: String,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?
            .to_string();
        let user = auth::authenticate(state.repo(), &token).await?;
        Ok(AuthUser { user, token })
    }
}

impl AuthUser {
    pub fn id(&self) -> UserId {
        self.user.id
    }

    pub fn is_staff(&self) -> bool {
        self.user.role.is_staff()
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.user.role != UserRole::Admin {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        Ok(())
    }

    /// Instructors and admins.
    pub fn require_staff(&self) -> Result<(), AppError> {
        if !self.is_staff() {
            return Err(AppError::Forbidden("Staff access required".to_string()));
        }
        Ok(())
    }

    /// The caller is `owner` or a staff member.
    pub fn require_self_or_staff(&self, owner: UserId) -> Result<(), AppError> {
        if self.user.id != owner && !self.is_staff() {
            return Err(AppError::Forbidden(
                "Not allowed to access another user's records".to_string(),
            ));
        }
        Ok(())
    }
}
