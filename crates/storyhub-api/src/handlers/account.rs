//! Password reset and email confirmation handlers.

use axum::Json;
use axum::extract::State;

use storyhub_auth::LogoutOutcome;

use crate::dto::request::{ConfirmEmailRequest, ForgotPasswordRequest, ResetPasswordRequest};
use crate::dto::response::{ApiResponse, MessageResponse};
use crate::error::ApiError;
use crate::extractors::{AuthUser, ValidatedJson};
use crate::state::AppState;

/// POST /api/auth/password/forgot
///
/// Answers the same way whether or not the account exists.
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ForgotPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.accounts.forgot_password(&req.email).await?;
    Ok(Json(ApiResponse::ok(MessageResponse::new(
        "If the account exists, a reset link has been sent",
    ))))
}

/// POST /api/auth/password/reset
pub async fn reset_password(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<LogoutOutcome>>, ApiError> {
    let outcome = state
        .accounts
        .reset_password(&req.token, &req.new_password)
        .await?;
    Ok(Json(ApiResponse::ok(outcome)))
}

/// POST /api/auth/email/verification
pub async fn request_email_confirmation(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.accounts.request_email_confirmation(auth.user_id).await?;
    Ok(Json(ApiResponse::ok(MessageResponse::new(
        "Confirmation link sent",
    ))))
}

/// POST /api/auth/email/confirm
pub async fn confirm_email(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ConfirmEmailRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.accounts.confirm_email(&req.token).await?;
    Ok(Json(ApiResponse::ok(MessageResponse::new("Email confirmed"))))
}
