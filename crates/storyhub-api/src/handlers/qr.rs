//! QR pairing handlers.

use axum::Json;
use axum::extract::State;

use storyhub_auth::ClientContext;
use storyhub_realtime::QrTicket;

use crate::dto::request::{QrLoginRequest, QrTokenRequest};
use crate::dto::response::{ApiResponse, SessionResponse};
use crate::error::ApiError;
use crate::extractors::{AuthUser, ClientInfo, ValidatedJson};
use crate::state::AppState;

/// POST /api/auth/qr
pub async fn issue_token(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<QrTokenRequest>,
) -> Result<Json<ApiResponse<QrTicket>>, ApiError> {
    let ticket = state.qr_broker.issue(&req.socket_id)?;
    Ok(Json(ApiResponse::ok(ticket)))
}

/// POST /api/auth/qr/login
///
/// The new session's tokens go to the pairing channel, not to the scanner.
pub async fn login(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    ValidatedJson(req): ValidatedJson<QrLoginRequest>,
) -> Result<Json<ApiResponse<SessionResponse>>, ApiError> {
    let context = ClientContext {
        fingerprint: req.fingerprint,
        ip_address: client.ip_address,
        user_agent: client.user_agent,
        device_info: req.device_info,
    };
    let result = state
        .qr_broker
        .login_by_qr_code(&req.token, auth.user_id, context)
        .await?;
    Ok(Json(ApiResponse::ok(SessionResponse::from_session(
        &result.session,
        None,
    ))))
}
