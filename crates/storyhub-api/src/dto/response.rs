//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use storyhub_auth::LoginResult;
use storyhub_entity::session::{DeviceInfo, SecurityLevel, Session, TokenPair};

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Simple message response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Message text.
    pub message: String,
}

impl MessageResponse {
    /// Creates a message response.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Session summary. Never includes the refresh token digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    /// Session id.
    pub id: Uuid,
    /// Client IP at login.
    pub ip_address: String,
    /// User-Agent at login.
    pub user_agent: Option<String>,
    /// Device description.
    pub device_info: Option<DeviceInfo>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Absolute expiry.
    pub expires_at: DateTime<Utc>,
    /// Last use.
    pub last_activity_at: DateTime<Utc>,
    /// Last assigned security level.
    pub security_level: SecurityLevel,
    /// Whether this is the session making the request.
    pub current: bool,
}

impl SessionResponse {
    /// Summarize `session`; `current` marks the caller's own session.
    pub fn from_session(session: &Session, current: Option<Uuid>) -> Self {
        Self {
            id: session.id,
            ip_address: session.ip_address.clone(),
            user_agent: session.user_agent.clone(),
            device_info: session.device().cloned(),
            created_at: session.created_at,
            expires_at: session.expires_at,
            last_activity_at: session.last_activity_at,
            security_level: session.security_level,
            current: current == Some(session.id),
        }
    }
}

/// Tokens and session of a successful login or refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Access and refresh tokens.
    #[serde(flatten)]
    pub tokens: TokenPair,
    /// The new session.
    pub session: SessionResponse,
}

impl From<LoginResult> for LoginResponse {
    fn from(result: LoginResult) -> Self {
        let session = SessionResponse::from_session(&result.session, Some(result.session.id));
        Self {
            tokens: result.tokens,
            session,
        }
    }
}

/// Result of an OTP confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpConfirmResponse {
    /// `"registered"`, `"email_changed"` or `"mobile_changed"`.
    pub outcome: String,
    /// Present after registration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login: Option<LoginResponse>,
}

/// Device update grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceTokenResponse {
    /// Token accepted by `PUT /api/auth/device`.
    pub token: String,
    /// Lifetime in seconds.
    pub expires_in: u64,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"ok"` or `"degraded"`.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Whether the cache answered.
    pub cache: bool,
}
