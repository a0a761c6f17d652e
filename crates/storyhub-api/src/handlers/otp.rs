//! One-time passcode handlers.

use axum::Json;
use axum::extract::State;

use storyhub_auth::{ClientContext, OtpConfirmation, OtpOutcome};

use crate::dto::request::{OtpConfirmRequest, OtpRequest};
use crate::dto::response::{ApiResponse, MessageResponse, OtpConfirmResponse};
use crate::error::ApiError;
use crate::extractors::{AuthUser, ClientInfo, ValidatedJson};
use crate::state::AppState;

/// POST /api/auth/otp
pub async fn request_otp(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<OtpRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.otp.request(&req.subject, req.purpose).await?;
    Ok(Json(ApiResponse::ok(MessageResponse::new(
        "If the address is eligible, a code has been sent",
    ))))
}

/// POST /api/auth/otp/confirm
///
/// Registration is anonymous; email and mobile changes need a bearer token.
pub async fn confirm_otp(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    client: ClientInfo,
    ValidatedJson(req): ValidatedJson<OtpConfirmRequest>,
) -> Result<Json<ApiResponse<OtpConfirmResponse>>, ApiError> {
    let confirmation = OtpConfirmation {
        code: req.code,
        subject: req.subject,
        purpose: req.purpose,
        user_id: auth.map(|a| a.user_id),
        client: ClientContext {
            fingerprint: req.fingerprint,
            ip_address: client.ip_address,
            user_agent: client.user_agent,
            device_info: req.device_info,
        },
    };

    let response = match state.otp.confirm(confirmation).await? {
        OtpOutcome::Registered(result) => OtpConfirmResponse {
            outcome: "registered".to_string(),
            login: Some((*result).into()),
        },
        OtpOutcome::EmailChanged => OtpConfirmResponse {
            outcome: "email_changed".to_string(),
            login: None,
        },
        OtpOutcome::MobileChanged => OtpConfirmResponse {
            outcome: "mobile_changed".to_string(),
            login: None,
        },
    };
    Ok(Json(ApiResponse::ok(response)))
}
