//! `AuthUser` extractor: verifies the bearer access token and the session it
//! is bound to.

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use uuid::Uuid;

use storyhub_core::error::AppError;
use storyhub_entity::user::UserRole;

use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated caller available in handlers.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Owner of the access token.
    pub user_id: Uuid,
    /// Session the access token is bound to.
    pub session_id: Uuid,
    /// Role claim, when present.
    pub role: Option<UserRole>,
    /// Email claim, when present.
    pub email: Option<String>,
}

fn bearer_token(parts: &Parts) -> Option<Result<&str, ApiError>> {
    let header = parts.headers.get(AUTHORIZATION)?;
    Some(
        header
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .ok_or_else(|| {
                ApiError(AppError::authentication(
                    "Invalid Authorization header format",
                ))
            }),
    )
}

async fn authenticate(token: &str, state: &AppState) -> Result<AuthUser, ApiError> {
    let (claims, session) = state.session_manager.authenticate_access(token).await?;
    Ok(AuthUser {
        user_id: session.user_id,
        session_id: session.id,
        role: claims.user_role,
        email: claims.email,
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| {
            ApiError(AppError::authentication("Missing Authorization header"))
        })??;
        authenticate(token, state).await
    }
}

impl OptionalFromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    /// No header means anonymous; a header that fails to verify is rejected.
    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        match bearer_token(parts) {
            None => Ok(None),
            Some(token) => authenticate(token?, state).await.map(Some),
        }
    }
}
