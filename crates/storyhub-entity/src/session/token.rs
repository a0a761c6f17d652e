//! Token values handed back to clients.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access and refresh tokens issued for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// Signed access token bound to `session_id`.
    pub access_token: String,
    /// Opaque single-use refresh token.
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    /// The session both tokens belong to.
    pub session_id: Uuid,
}
