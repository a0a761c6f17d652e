//! Session lifecycle manager: login, logout, refresh rotation, and
//! security enforcement.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use storyhub_core::config::{OverflowStrategy, SecurityConfig, SessionConfig};
use storyhub_database::UserDirectory;
use storyhub_entity::session::{DeviceInfo, NewSession, Session, TokenPair};
use storyhub_entity::user::User;

use crate::error::{AuthError, AuthResult};
use crate::password::PasswordHasher;
use crate::security::{SecurityReport, SecurityValidator};
use crate::token::{AccountTokens, TokenClaims, TokenCodecs, refresh};

use super::store::{Removal, SessionStore};

/// Client binding captured at login.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContext {
    /// Client-supplied device identifier. Required.
    pub fingerprint: String,
    /// Caller IP address.
    pub ip_address: String,
    /// User-Agent header.
    pub user_agent: Option<String>,
    /// Structured device information.
    pub device_info: Option<DeviceInfo>,
}

/// Result of a successful login or refresh.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    /// Tokens for the new session.
    pub tokens: TokenPair,
    /// The created session.
    pub session: Session,
}

/// Result of a logout. Logging out is idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutOutcome {
    /// Sessions removed by this call.
    pub sessions_invalidated: usize,
    /// Nothing was left to remove.
    pub already_invalidated: bool,
    /// Every derived cache entry was cleared.
    pub cache_invalidated: bool,
}

impl From<Removal> for LogoutOutcome {
    fn from(removal: Removal) -> Self {
        Self {
            sessions_invalidated: removal.count(),
            already_invalidated: removal.count() == 0,
            cache_invalidated: removal.cache_invalidated,
        }
    }
}

/// Manages the complete session lifecycle.
#[derive(Clone)]
pub struct SessionManager {
    codecs: Arc<TokenCodecs>,
    account_tokens: AccountTokens,
    store: Arc<SessionStore>,
    validator: Arc<SecurityValidator>,
    users: Arc<dyn UserDirectory>,
    hasher: Arc<PasswordHasher>,
    session_config: SessionConfig,
    security_config: SecurityConfig,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("session_config", &self.session_config)
            .field("security_config", &self.security_config)
            .finish()
    }
}

impl SessionManager {
    /// Creates a new session manager with all required dependencies.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        codecs: Arc<TokenCodecs>,
        store: Arc<SessionStore>,
        validator: Arc<SecurityValidator>,
        users: Arc<dyn UserDirectory>,
        hasher: Arc<PasswordHasher>,
        session_config: SessionConfig,
        security_config: SecurityConfig,
    ) -> Self {
        Self {
            account_tokens: AccountTokens::new(codecs.as_ref().clone()),
            codecs,
            store,
            validator,
            users,
            hasher,
            session_config,
            security_config,
        }
    }

    /// The underlying session store.
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// The user directory sessions are resolved against.
    pub fn users(&self) -> &Arc<dyn UserDirectory> {
        &self.users
    }

    /// Create a session for `user_id` and issue its tokens.
    pub async fn login(&self, user_id: Uuid, client: ClientContext) -> AuthResult<LoginResult> {
        let user = self
            .users
            .get_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        self.login_user(&user, client).await
    }

    /// Create a session for an already resolved user.
    ///
    /// The session id and refresh token are generated first so the access
    /// token can be bound to the session before the single durable write.
    pub async fn login_user(&self, user: &User, client: ClientContext) -> AuthResult<LoginResult> {
        if client.fingerprint.trim().is_empty() {
            return Err(AuthError::Validation("Device fingerprint is required".into()));
        }

        self.enforce_session_limit(user.id).await?;

        let now = Utc::now();
        let session_id = Uuid::new_v4();
        let refresh_token = refresh::generate();
        let access_token = self.sign_access(user, session_id)?;

        let session = self
            .store
            .create(&NewSession {
                id: session_id,
                user_id: user.id,
                refresh_token_hash: refresh::digest(&refresh_token),
                fingerprint: client.fingerprint,
                ip_address: client.ip_address,
                user_agent: client.user_agent,
                device_info: client.device_info,
                expires_at: self.session_expiry(now),
            })
            .await?;

        info!(
            user_id = %user.id,
            session_id = %session.id,
            ip = %session.ip_address,
            "Session created"
        );

        Ok(LoginResult {
            tokens: self.token_pair(access_token, refresh_token, session.id),
            session,
        })
    }

    /// Verify email and password, then log in.
    ///
    /// Unknown accounts, wrong passwords, and accounts that may not log in
    /// all fail the same way.
    pub async fn login_with_password(
        &self,
        email: &str,
        password: &str,
        client: ClientContext,
    ) -> AuthResult<LoginResult> {
        let Some(user) = self.users.get_user_by_email(email.trim()).await? else {
            self.hasher.verify_decoy(password).await?;
            warn!(email = %email, "Login attempt for unknown account");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify(password, &user.password_hash).await? {
            warn!(user_id = %user.id, "Login attempt with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        if !user.can_login() {
            warn!(user_id = %user.id, status = %user.status, "Login attempt for inactive account");
            return Err(AuthError::InvalidCredentials);
        }

        self.login_user(&user, client).await
    }

    /// Remove one session.
    pub async fn logout_session(&self, session_id: Uuid) -> AuthResult<LogoutOutcome> {
        let outcome = LogoutOutcome::from(self.store.delete(session_id).await?);
        info!(
            session_id = %session_id,
            already_invalidated = outcome.already_invalidated,
            "Session logged out"
        );
        Ok(outcome)
    }

    /// Remove one session of `user_id`. Sessions of other users are
    /// reported as not found.
    pub async fn logout_owned_session(
        &self,
        user_id: Uuid,
        session_id: Uuid,
    ) -> AuthResult<LogoutOutcome> {
        if let Some(session) = self.store.get_by_id(session_id).await? {
            if session.user_id != user_id {
                return Err(AuthError::SessionNotFound);
            }
        }
        self.logout_session(session_id).await
    }

    /// Log out the session owning `refresh_token`, or every session of its
    /// user when `logout_all_devices` is set.
    pub async fn logout_by_refresh_token(
        &self,
        refresh_token: &str,
        logout_all_devices: bool,
    ) -> AuthResult<LogoutOutcome> {
        let Some(session) = self.store.get_by_refresh_token(refresh_token, true).await? else {
            return Ok(LogoutOutcome::from(Removal {
                sessions: Vec::new(),
                cache_invalidated: true,
            }));
        };

        if logout_all_devices {
            return self.logout_all(session.user_id).await;
        }
        self.logout_session(session.id).await
    }

    /// Remove every session of a user and record the logout.
    pub async fn logout_all(&self, user_id: Uuid) -> AuthResult<LogoutOutcome> {
        let removal = self.store.delete_all_for_user(user_id, None).await?;
        self.users.record_logout(user_id, Utc::now()).await?;
        let outcome = LogoutOutcome::from(removal);
        info!(
            user_id = %user_id,
            sessions = outcome.sessions_invalidated,
            "Logged out of every device"
        );
        Ok(outcome)
    }

    /// Rotate a refresh token: the presented session is terminated and a
    /// new one is created with fresh tokens.
    ///
    /// A refresh token can be redeemed once. Replaying a rotated token
    /// revokes every session of its owner when configured to.
    pub async fn refresh_tokens(
        &self,
        refresh_token: &str,
        fingerprint: &str,
        user_agent: Option<String>,
    ) -> AuthResult<LoginResult> {
        let Some(session) = self.store.get_by_refresh_token(refresh_token, false).await? else {
            self.handle_unknown_refresh(refresh_token).await?;
            return Err(AuthError::SessionNotFound);
        };

        if session.fingerprint != fingerprint {
            warn!(
                security_event = true,
                session_id = %session.id,
                user_id = %session.user_id,
                "Refresh attempted with a different device fingerprint"
            );
            self.store.delete(session.id).await?;
            return Err(AuthError::FingerprintMismatch);
        }

        if !session.is_usable() {
            return Err(AuthError::SessionNotFound);
        }

        self.enforce_security(&session).await?;

        let user = self
            .users
            .get_user_by_id(session.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let Some(previous) = self.store.take_by_refresh_token(refresh_token).await? else {
            warn!(
                security_event = true,
                session_id = %session.id,
                "Refresh token redeemed concurrently"
            );
            return Err(AuthError::SessionNotFound);
        };

        let replacement = self
            .login_user(
                &user,
                ClientContext {
                    fingerprint: previous.fingerprint.clone(),
                    ip_address: previous.ip_address.clone(),
                    user_agent: user_agent.or(previous.user_agent.clone()),
                    device_info: previous.device().cloned(),
                },
            )
            .await;

        let result = match replacement {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    session_id = %previous.id,
                    error = %e,
                    "Replacement session not created, restoring refresh token"
                );
                if let Err(restore) = self.store.restore(&previous).await {
                    error!(
                        session_id = %previous.id,
                        error = %restore,
                        "Failed to restore session after refresh failure"
                    );
                }
                return Err(e);
            }
        };

        // Only a delivered rotation makes the old token a replay.
        self.store
            .mark_refresh_spent(
                &previous.refresh_token_hash,
                previous.user_id,
                self.codecs.refresh_lifetime(),
            )
            .await;

        info!(
            user_id = %user.id,
            previous_session_id = %previous.id,
            session_id = %result.session.id,
            "Refresh token rotated"
        );
        Ok(result)
    }

    /// Validate `session` and apply the result.
    ///
    /// A session that requires compromise is marked critical, deactivated,
    /// and expired, and the call fails with `SessionCompromised`.
    pub async fn enforce_security(&self, session: &Session) -> AuthResult<SecurityReport> {
        let now = Utc::now();
        let peers = self.store.list_active_for_user(session.user_id).await?;
        let report = self.validator.validate(session, &peers, now).await;

        if report.requires_compromise() {
            let mut compromised = session.clone();
            compromised.compromise(now);
            self.store.update(&compromised).await?;
            warn!(
                security_event = true,
                session_id = %session.id,
                user_id = %session.user_id,
                risk_score = report.risk_score,
                violations = report.violations.len(),
                "Session compromised"
            );
            return Err(AuthError::SessionCompromised);
        }

        let level = report.level();
        if level != session.security_level {
            let mut updated = session.clone();
            updated.security_level = level;
            updated.last_activity_at = now;
            self.store.update(&updated).await?;
            if !report.is_valid {
                warn!(
                    security_event = true,
                    session_id = %session.id,
                    level = %level,
                    risk_score = report.risk_score,
                    "Session security level raised"
                );
            }
        }

        Ok(report)
    }

    /// Resolve an access token to its claims and live session.
    pub async fn authenticate_access(&self, token: &str) -> AuthResult<(TokenClaims, Session)> {
        let claims = self.codecs.access.verify(token)?;
        let (Some(user_id), Some(session_id)) = (claims.user_id(), claims.session_id) else {
            return Err(AuthError::TokenInvalid);
        };

        let session = self
            .store
            .get_by_id(session_id)
            .await?
            .filter(|s| s.user_id == user_id && s.is_usable())
            .ok_or(AuthError::SessionNotFound)?;

        Ok((claims, session))
    }

    /// Active sessions of a user, oldest first.
    pub async fn list_sessions(&self, user_id: Uuid) -> AuthResult<Vec<Session>> {
        Ok(self.store.list_active_for_user(user_id).await?)
    }

    /// Mint a device update grant for a live session of `user_id`.
    pub async fn issue_device_update(&self, user_id: Uuid, session_id: Uuid) -> AuthResult<String> {
        let session = self
            .store
            .get_by_id(session_id)
            .await?
            .filter(|s| s.user_id == user_id && s.is_usable())
            .ok_or(AuthError::SessionNotFound)?;
        Ok(self
            .account_tokens
            .issue_device_update(user_id, session.id)?)
    }

    /// Replace the device information of the session named by a device
    /// update grant.
    pub async fn update_device(&self, token: &str, device_info: DeviceInfo) -> AuthResult<Session> {
        let grant = self.account_tokens.verify_device_update(token)?;
        let session_id = grant.session_id.ok_or(AuthError::TokenInvalid)?;

        let mut session = self
            .store
            .get_by_id(session_id)
            .await?
            .filter(|s| s.user_id == grant.user_id && s.is_usable())
            .ok_or(AuthError::SessionNotFound)?;

        session.set_device_info(device_info);
        session.last_activity_at = Utc::now();
        let updated = self
            .store
            .update(&session)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        info!(session_id = %updated.id, user_id = %updated.user_id, "Device information updated");
        Ok(updated)
    }

    async fn handle_unknown_refresh(&self, refresh_token: &str) -> AuthResult<()> {
        let Some(owner) = self.store.spent_refresh_owner(refresh_token).await else {
            return Ok(());
        };

        warn!(
            security_event = true,
            user_id = %owner,
            "Rotated refresh token replayed"
        );

        if self.security_config.revoke_all_on_refresh_reuse {
            let removal = self.store.delete_all_for_user(owner, None).await?;
            warn!(
                security_event = true,
                user_id = %owner,
                sessions = removal.count(),
                "Revoked every session after refresh token reuse"
            );
        }
        Ok(())
    }

    async fn enforce_session_limit(&self, user_id: Uuid) -> AuthResult<()> {
        let limits = &self.session_config.limits;
        let max = limits.max_per_user as usize;
        let active = self.store.list_active_for_user(user_id).await?;
        if active.len() < max {
            return Ok(());
        }

        match limits.overflow_strategy {
            OverflowStrategy::Warn => {
                warn!(
                    user_id = %user_id,
                    active = active.len(),
                    limit = max,
                    "Session limit exceeded, allowing login"
                );
            }
            OverflowStrategy::Deny => {
                warn!(
                    user_id = %user_id,
                    active = active.len(),
                    limit = max,
                    "Session limit reached, login denied"
                );
                return Err(AuthError::SessionLimitExceeded);
            }
            OverflowStrategy::KickOldest => {
                let excess = active.len() + 1 - max;
                for oldest in active.iter().take(excess) {
                    self.store.delete(oldest.id).await?;
                    info!(
                        user_id = %user_id,
                        session_id = %oldest.id,
                        "Oldest session removed to make room"
                    );
                }
            }
        }
        Ok(())
    }

    fn sign_access(&self, user: &User, session_id: Uuid) -> AuthResult<String> {
        let claims = TokenClaims::new(user.id.to_string())
            .with_email(&user.email)
            .with_role(user.role)
            .with_session(session_id);
        Ok(self.codecs.access.sign(claims)?)
    }

    fn session_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::seconds(self.codecs.refresh_lifetime().as_secs() as i64)
    }

    fn token_pair(&self, access_token: String, refresh_token: String, session_id: Uuid) -> TokenPair {
        TokenPair {
            access_token,
            refresh_token,
            expires_in: self.codecs.access.lifetime().as_secs(),
            session_id,
        }
    }
}
