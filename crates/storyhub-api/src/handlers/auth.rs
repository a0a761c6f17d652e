//! Session handlers: login, refresh, logout, session listing, device
//! metadata.

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use storyhub_auth::{ClientContext, LogoutOutcome};

use crate::dto::request::{LoginRequest, LogoutRequest, RefreshRequest, UpdateDeviceRequest};
use crate::dto::response::{ApiResponse, DeviceTokenResponse, LoginResponse, SessionResponse};
use crate::error::ApiError;
use crate::extractors::{AuthUser, ClientInfo, ValidatedJson};
use crate::state::AppState;

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    client: ClientInfo,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let context = ClientContext {
        fingerprint: req.fingerprint,
        ip_address: client.ip_address,
        user_agent: client.user_agent,
        device_info: req.device_info,
    };
    let result = state
        .session_manager
        .login_with_password(&req.email, &req.password, context)
        .await?;
    Ok(Json(ApiResponse::ok(result.into())))
}

/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    client: ClientInfo,
    ValidatedJson(req): ValidatedJson<RefreshRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let result = state
        .session_manager
        .refresh_tokens(&req.refresh_token, &req.fingerprint, client.user_agent)
        .await?;
    Ok(Json(ApiResponse::ok(result.into())))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LogoutRequest>,
) -> Result<Json<ApiResponse<LogoutOutcome>>, ApiError> {
    let outcome = state
        .session_manager
        .logout_by_refresh_token(&req.refresh_token, req.all_devices)
        .await?;
    Ok(Json(ApiResponse::ok(outcome)))
}

/// GET /api/auth/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<SessionResponse>>>, ApiError> {
    let sessions = state.session_manager.list_sessions(auth.user_id).await?;
    let data = sessions
        .iter()
        .map(|s| SessionResponse::from_session(s, Some(auth.session_id)))
        .collect();
    Ok(Json(ApiResponse::ok(data)))
}

/// DELETE /api/auth/sessions/{id}
pub async fn delete_session(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ApiResponse<LogoutOutcome>>, ApiError> {
    let outcome = state
        .session_manager
        .logout_owned_session(auth.user_id, session_id)
        .await?;
    Ok(Json(ApiResponse::ok(outcome)))
}

/// POST /api/auth/device/token
pub async fn device_token(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<DeviceTokenResponse>>, ApiError> {
    let token = state
        .session_manager
        .issue_device_update(auth.user_id, auth.session_id)
        .await?;
    Ok(Json(ApiResponse::ok(DeviceTokenResponse {
        token,
        expires_in: state.config.auth.tokens.device_update.expires_in_seconds,
    })))
}

/// PUT /api/auth/device
pub async fn update_device(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<UpdateDeviceRequest>,
) -> Result<Json<ApiResponse<SessionResponse>>, ApiError> {
    let session = state
        .session_manager
        .update_device(&req.token, req.device_info)
        .await?;
    Ok(Json(ApiResponse::ok(SessionResponse::from_session(
        &session,
        Some(session.id),
    ))))
}
