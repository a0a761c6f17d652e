//! Cache key builders for every entry the session subsystem writes.
//!
//! The three session namespaces (by id, by refresh digest, by user) are
//! always invalidated together.

use uuid::Uuid;

/// Session projection by session id.
pub fn session_by_id(session_id: Uuid) -> String {
    format!("session:id:{session_id}")
}

/// Session id by refresh token digest.
pub fn session_by_refresh(refresh_hash: &str) -> String {
    format!("session:refresh:{refresh_hash}")
}

/// Active session list of a user.
pub fn user_sessions(user_id: Uuid) -> String {
    format!("session:user:{user_id}")
}

/// Marker left behind by a rotated refresh token, pointing at its owner.
pub fn spent_refresh(refresh_hash: &str) -> String {
    format!("session:spent:{refresh_hash}")
}

/// Tombstone left by a session removal.
pub fn session_removed(session_id: Uuid) -> String {
    format!("session:removed:{session_id}")
}

/// Marker for a single-use account token that was redeemed.
pub fn consumed_token(token_id: Uuid) -> String {
    format!("token:consumed:{token_id}")
}

/// Failed OTP confirmation counter for one purpose and subject.
pub fn otp_attempts(purpose: &str, subject: &str) -> String {
    format!("otp:attempts:{purpose}:{}", subject.trim().to_lowercase())
}
