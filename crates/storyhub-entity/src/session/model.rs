//! Session entity model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use super::device::DeviceInfo;
use super::level::SecurityLevel;

/// A durable session binding a user, a refresh token digest, and the
/// client that logged in.
///
/// The refresh token itself is never stored; `refresh_token_hash` is the
/// hex SHA-256 digest of the opaque token handed to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Session {
    /// Unique session identifier.
    pub id: Uuid,
    /// The user this session belongs to.
    pub user_id: Uuid,
    /// SHA-256 hex digest of the current refresh token. Unique.
    pub refresh_token_hash: String,
    /// Client-supplied device identifier.
    pub fingerprint: String,
    /// Client IP at login.
    pub ip_address: String,
    /// User-Agent header value.
    pub user_agent: Option<String>,
    /// Structured device information.
    pub device_info: Option<Json<DeviceInfo>>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Absolute expiry. Always later than `created_at`.
    pub expires_at: DateTime<Utc>,
    /// Last time the session was used.
    pub last_activity_at: DateTime<Utc>,
    /// Cleared when the session is compromised.
    pub is_active: bool,
    /// Level assigned by the last security validation.
    pub security_level: SecurityLevel,
}

impl Session {
    /// Whether the session has passed its absolute expiry at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether the session has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Whether the session may still authenticate requests.
    pub fn is_usable(&self) -> bool {
        self.is_active && self.security_level != SecurityLevel::Critical && !self.is_expired()
    }

    /// Structured device information, if any was recorded.
    pub fn device(&self) -> Option<&DeviceInfo> {
        self.device_info.as_ref().map(|info| &info.0)
    }

    /// Replace the structured device information.
    pub fn set_device_info(&mut self, info: DeviceInfo) {
        self.device_info = Some(Json(info));
    }

    /// Age of the session at `now`.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now - self.created_at
    }

    /// Mark the session compromised: critical, inactive, and expired.
    ///
    /// `expires_at` is pulled back to `now` but never to or before
    /// `created_at`.
    pub fn compromise(&mut self, now: DateTime<Utc>) {
        self.security_level = SecurityLevel::Critical;
        self.is_active = false;
        let floor = self.created_at + Duration::milliseconds(1);
        self.expires_at = if now > floor { now } else { floor };
    }
}

/// Data required to create a new session.
///
/// The id is chosen by the caller so tokens bound to the session can be
/// minted before the single durable write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSession {
    /// Pre-generated session identifier.
    pub id: Uuid,
    /// Owner.
    pub user_id: Uuid,
    /// SHA-256 hex digest of the refresh token.
    pub refresh_token_hash: String,
    /// Client-supplied device identifier.
    pub fingerprint: String,
    /// Client IP.
    pub ip_address: String,
    /// User-Agent header.
    pub user_agent: Option<String>,
    /// Structured device information.
    pub device_info: Option<DeviceInfo>,
    /// Absolute expiry.
    pub expires_at: DateTime<Utc>,
}

impl NewSession {
    /// Materialize the row as it will be stored at `now`.
    pub fn into_session(self, now: DateTime<Utc>) -> Session {
        Session {
            id: self.id,
            user_id: self.user_id,
            refresh_token_hash: self.refresh_token_hash,
            fingerprint: self.fingerprint,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            device_info: self.device_info.map(Json),
            created_at: now,
            expires_at: self.expires_at,
            last_activity_at: now,
            is_active: true,
            security_level: SecurityLevel::Low,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(now: DateTime<Utc>) -> Session {
        NewSession {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            refresh_token_hash: "abc".to_string(),
            fingerprint: "fp".to_string(),
            ip_address: "10.0.0.1".to_string(),
            user_agent: None,
            device_info: None,
            expires_at: now + Duration::hours(1),
        }
        .into_session(now)
    }

    #[test]
    fn test_compromise_expires_session() {
        let now = Utc::now();
        let mut session = sample(now);
        session.compromise(now + Duration::minutes(5));
        assert_eq!(session.security_level, SecurityLevel::Critical);
        assert!(!session.is_active);
        assert!(!session.is_usable());
        assert!(session.expires_at > session.created_at);
    }

    #[test]
    fn test_compromise_keeps_expiry_after_creation() {
        let now = Utc::now();
        let mut session = sample(now);
        session.compromise(now);
        assert!(session.expires_at > session.created_at);
    }

    #[test]
    fn test_device_info_roundtrips_through_json() {
        let now = Utc::now();
        let mut session = sample(now);
        session.device_info = Some(Json(DeviceInfo {
            os: Some("iOS 18".to_string()),
            ..Default::default()
        }));
        let json = serde_json::to_string(&session).unwrap();
        assert!(json.contains("\"os\":\"iOS 18\""));
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }
}
