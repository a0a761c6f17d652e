//! QR pairing handshake.
//!
//! A device without a session asks for a pairing token bound to its socket
//! and renders it as a QR code. An authenticated device scans it; the broker
//! creates a session for the scanning user and publishes the tokens on the
//! socket's channel. An expired code is replaced in place so the waiting
//! device can re-render without starting over.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use storyhub_auth::{
    AuthError, AuthResult, ClientContext, LoginResult, SessionManager, TokenClaims, TokenCodec,
    TokenError,
};
use storyhub_core::traits::PubSub;

use super::event::QrLoginEvent;

/// Longest socket id accepted.
const MAX_SOCKET_ID_LEN: usize = 128;

/// Channel a pairing socket listens on.
pub fn channel_for(socket_id: &str) -> String {
    format!("qr-login:{socket_id}")
}

/// A freshly issued pairing token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrTicket {
    /// Signed pairing token to render as a QR code.
    pub token: String,
    /// Socket the token is bound to.
    pub socket_id: String,
    /// Channel the socket should listen on.
    pub channel: String,
    /// Token lifetime in seconds.
    pub expires_in: u64,
}

/// Brokers QR pairing logins over the publish/subscribe service.
#[derive(Clone)]
pub struct QrLoginBroker {
    codec: TokenCodec,
    sessions: Arc<SessionManager>,
    pubsub: Arc<dyn PubSub>,
}

impl std::fmt::Debug for QrLoginBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QrLoginBroker")
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

impl QrLoginBroker {
    /// Creates a broker. `codec` must be the QR-login class codec.
    pub fn new(codec: TokenCodec, sessions: Arc<SessionManager>, pubsub: Arc<dyn PubSub>) -> Self {
        Self {
            codec,
            sessions,
            pubsub,
        }
    }

    /// Mint a pairing token bound to `socket_id`.
    pub fn issue(&self, socket_id: &str) -> AuthResult<QrTicket> {
        let socket_id = socket_id.trim();
        if socket_id.is_empty() || socket_id.len() > MAX_SOCKET_ID_LEN {
            return Err(AuthError::Validation(format!(
                "Socket id must be 1 to {MAX_SOCKET_ID_LEN} characters"
            )));
        }

        let token = self
            .codec
            .sign(TokenClaims::new(socket_id).with_socket(socket_id))?;
        Ok(QrTicket {
            token,
            socket_id: socket_id.to_string(),
            channel: channel_for(socket_id),
            expires_in: self.codec.lifetime().as_secs(),
        })
    }

    /// Complete a pairing: `user_id` scanned `token` from `client`.
    ///
    /// On success the new session's tokens are published to the pairing
    /// channel. An expired token is answered with a replacement on the same
    /// channel and `TokenExpired`. Any other failure publishes nothing.
    pub async fn login_by_qr_code(
        &self,
        token: &str,
        user_id: Uuid,
        client: ClientContext,
    ) -> AuthResult<LoginResult> {
        let claims = match self.codec.verify(token) {
            Ok(claims) => claims,
            Err(TokenError::Expired) => return Err(self.replace_expired(token).await),
            Err(e) => {
                warn!(security_event = true, user_id = %user_id, "Invalid QR login token");
                return Err(e.into());
            }
        };

        let Some(socket_id) = claims.socket_id.clone() else {
            warn!(security_event = true, user_id = %user_id, "QR login token without socket");
            return Err(AuthError::TokenInvalid);
        };

        let result = self.sessions.login(user_id, client).await?;

        let event = QrLoginEvent::AccessTokenGenerated {
            socket_id: socket_id.clone(),
            access_token: result.tokens.access_token.clone(),
            refresh_token: result.tokens.refresh_token.clone(),
            expires_in: result.tokens.expires_in,
            session_id: result.session.id,
            claims,
        };

        if let Err(e) = self.publish(&socket_id, &event).await {
            error!(
                socket_id = %socket_id,
                session_id = %result.session.id,
                error = %e,
                "Failed to deliver QR login tokens, removing session"
            );
            if let Err(e) = self.sessions.logout_session(result.session.id).await {
                error!(session_id = %result.session.id, error = %e, "Failed to remove undelivered session");
            }
            return Err(e);
        }

        info!(
            socket_id = %socket_id,
            user_id = %user_id,
            session_id = %result.session.id,
            "QR login completed"
        );
        Ok(result)
    }

    /// Publish a replacement for an expired pairing token. Returns the error
    /// the caller should see.
    async fn replace_expired(&self, token: &str) -> AuthError {
        let socket_id = match self.codec.decode_unverified(token) {
            Ok(TokenClaims {
                socket_id: Some(socket_id),
                ..
            }) => socket_id,
            _ => return AuthError::TokenInvalid,
        };

        let ticket = match self.issue(&socket_id) {
            Ok(ticket) => ticket,
            Err(e) => return e,
        };

        let event = QrLoginEvent::LoginTokenExpired {
            socket_id: ticket.socket_id.clone(),
            token: ticket.token,
            expires_in: ticket.expires_in,
        };
        match self.publish(&ticket.socket_id, &event).await {
            Ok(()) => info!(socket_id = %ticket.socket_id, "Expired QR login token replaced"),
            Err(e) => warn!(
                socket_id = %ticket.socket_id,
                error = %e,
                "Failed to publish replacement QR login token"
            ),
        }
        AuthError::TokenExpired
    }

    async fn publish(&self, socket_id: &str, event: &QrLoginEvent) -> AuthResult<()> {
        let payload = serde_json::to_string(event).map_err(storyhub_core::AppError::from)?;
        self.pubsub.publish(&channel_for(socket_id), &payload).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use storyhub_auth::{NoopIpReputation, PasswordHasher, SecurityValidator, SessionStore, TokenCodecs};
    use storyhub_cache::CacheManager;
    use storyhub_cache::memory::MemoryCacheProvider;
    use storyhub_core::config::cache::MemoryCacheConfig;
    use storyhub_core::config::{AuthConfig, SecurityConfig, SessionConfig};
    use storyhub_core::{AppError, AppResult};
    use storyhub_database::repositories::{MemorySessionRepository, MemoryUserDirectory};
    use storyhub_entity::user::{User, UserRole, UserStatus};

    use super::*;
    use crate::bridge::MemoryPubSub;

    struct Fixture {
        broker: QrLoginBroker,
        pubsub: Arc<MemoryPubSub>,
        user_id: Uuid,
    }

    #[derive(Debug)]
    struct FailingPubSub;

    #[async_trait::async_trait]
    impl PubSub for FailingPubSub {
        async fn publish(&self, _channel: &str, _payload: &str) -> AppResult<()> {
            Err(AppError::pubsub("broker unreachable"))
        }
    }

    fn session_manager() -> (Arc<TokenCodecs>, Arc<SessionManager>, Uuid) {
        let codecs = Arc::new(TokenCodecs::from_config(&AuthConfig::default()).unwrap());

        let cache = Arc::new(CacheManager::from_provider(
            Arc::new(MemoryCacheProvider::new(&MemoryCacheConfig::default(), 60)),
            Duration::from_secs(60),
        ));
        let store = Arc::new(SessionStore::new(
            Arc::new(MemorySessionRepository::new()),
            cache,
            Duration::from_secs(60),
        ));
        let users = Arc::new(MemoryUserDirectory::new());
        let now = Utc::now();
        let user_id = Uuid::new_v4();
        users.insert(User {
            id: user_id,
            email: "author@example.com".to_string(),
            mobile: None,
            password_hash: String::new(),
            display_name: None,
            role: UserRole::Author,
            status: UserStatus::Active,
            email_verified: true,
            last_logout_at: None,
            created_at: now,
            updated_at: now,
        });

        let sessions = Arc::new(SessionManager::new(
            codecs.clone(),
            store,
            Arc::new(SecurityValidator::new(
                Arc::new(NoopIpReputation),
                SecurityConfig::default(),
            )),
            users,
            Arc::new(PasswordHasher::new()),
            SessionConfig::default(),
            SecurityConfig::default(),
        ));
        (codecs, sessions, user_id)
    }

    fn fixture() -> Fixture {
        let (codecs, sessions, user_id) = session_manager();
        let pubsub = Arc::new(MemoryPubSub::new(8));
        Fixture {
            broker: QrLoginBroker::new(codecs.qr_login.clone(), sessions, pubsub.clone()),
            pubsub,
            user_id,
        }
    }

    fn client() -> ClientContext {
        ClientContext {
            fingerprint: "scanner".to_string(),
            ip_address: "192.0.2.10".to_string(),
            ..ClientContext::default()
        }
    }

    #[tokio::test]
    async fn test_scan_publishes_tokens() {
        let f = fixture();
        let ticket = f.broker.issue("sock-1").unwrap();
        let mut rx = f.pubsub.subscribe(&ticket.channel).await;

        let result = f
            .broker
            .login_by_qr_code(&ticket.token, f.user_id, client())
            .await
            .unwrap();

        let event: QrLoginEvent = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        match event {
            QrLoginEvent::AccessTokenGenerated {
                socket_id,
                access_token,
                session_id,
                claims,
                ..
            } => {
                assert_eq!(socket_id, "sock-1");
                assert_eq!(access_token, result.tokens.access_token);
                assert_eq!(session_id, result.session.id);
                assert_eq!(claims.socket_id.as_deref(), Some("sock-1"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_expired_code_is_replaced_for_same_socket() {
        let f = fixture();
        let mut rx = f.pubsub.subscribe(&channel_for("sock-2")).await;
        let stale = f
            .broker
            .codec
            .sign_at(
                TokenClaims::new("sock-2").with_socket("sock-2"),
                Utc::now().timestamp() - 3600,
            )
            .unwrap();

        let err = f
            .broker
            .login_by_qr_code(&stale, f.user_id, client())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));

        let event: QrLoginEvent = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        let QrLoginEvent::LoginTokenExpired { token, .. } = event else {
            panic!("expected a replacement token");
        };
        let replacement = f.broker.codec.verify(&token).unwrap();
        assert_eq!(replacement.socket_id.as_deref(), Some("sock-2"));
    }

    #[tokio::test]
    async fn test_tampered_code_publishes_nothing() {
        let f = fixture();
        let ticket = f.broker.issue("sock-3").unwrap();
        let mut rx = f.pubsub.subscribe(&ticket.channel).await;

        let mut tampered = ticket.token.clone();
        tampered.push('x');
        let err = f
            .broker
            .login_by_qr_code(&tampered, f.user_id, client())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_undelivered_session_is_removed() {
        let (codecs, sessions, user_id) = session_manager();
        let broker = QrLoginBroker::new(
            codecs.qr_login.clone(),
            sessions.clone(),
            Arc::new(FailingPubSub),
        );
        let ticket = broker.issue("sock-4").unwrap();

        let err = broker
            .login_by_qr_code(&ticket.token, user_id, client())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Internal(_)));
        assert!(sessions.list_sessions(user_id).await.unwrap().is_empty());
    }

    #[test]
    fn test_issue_rejects_empty_socket() {
        let f = fixture();
        assert!(matches!(f.broker.issue("  "), Err(AuthError::Validation(_))));
    }
}
