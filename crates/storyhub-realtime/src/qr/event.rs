//! Events published on a pairing channel.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use storyhub_auth::TokenClaims;

/// Event delivered to the device waiting on a pairing channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QrLoginEvent {
    /// The code was scanned and a session was created for the waiting device.
    #[serde(rename_all = "camelCase")]
    AccessTokenGenerated {
        /// Pairing socket.
        socket_id: String,
        /// Access token for the new session.
        access_token: String,
        /// Refresh token for the new session.
        refresh_token: String,
        /// Access token lifetime in seconds.
        expires_in: u64,
        /// The new session.
        session_id: Uuid,
        /// Claims of the scanned pairing token.
        claims: TokenClaims,
    },
    /// The scanned code had expired; `token` replaces it.
    #[serde(rename_all = "camelCase")]
    LoginTokenExpired {
        /// Pairing socket.
        socket_id: String,
        /// Replacement pairing token.
        token: String,
        /// Replacement lifetime in seconds.
        expires_in: u64,
    },
}

impl QrLoginEvent {
    /// Socket the event is addressed to.
    pub fn socket_id(&self) -> &str {
        match self {
            Self::AccessTokenGenerated { socket_id, .. } | Self::LoginTokenExpired { socket_id, .. } => {
                socket_id
            }
        }
    }
}
