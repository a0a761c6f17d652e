//! Cache-backed session storage.
//!
//! The repository is the source of truth. The cache holds three derived
//! namespaces (by id, by refresh digest, by user) that are written after a
//! durable create and invalidated together on every removal. Cache failures
//! never fail an operation; they are logged and the repository answers.
//!
//! A removal leaves a short-lived tombstone before clearing the namespaces.
//! Read-through writes check for it after writing, so a repository read that
//! raced a removal cannot put the removed session back into the cache.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use storyhub_cache::CacheManager;
use storyhub_cache::keys;
use storyhub_core::result::AppResult;
use storyhub_core::traits::CacheProvider;
use storyhub_database::SessionRepository;
use storyhub_entity::session::{NewSession, Session};

use crate::token::refresh;

/// Sessions removed by one operation.
#[derive(Debug, Clone, Default)]
pub struct Removal {
    /// The removed rows.
    pub sessions: Vec<Session>,
    /// Every derived cache entry was cleared.
    pub cache_invalidated: bool,
}

impl Removal {
    /// Number of removed sessions.
    pub fn count(&self) -> usize {
        self.sessions.len()
    }
}

/// Session persistence with a read-through cache.
#[derive(Debug, Clone)]
pub struct SessionStore {
    repo: Arc<dyn SessionRepository>,
    cache: Arc<CacheManager>,
    ttl: Duration,
}

impl SessionStore {
    /// Creates a store. `cache_ttl` bounds how long a projection is cached.
    pub fn new(repo: Arc<dyn SessionRepository>, cache: Arc<CacheManager>, cache_ttl: Duration) -> Self {
        Self {
            repo,
            cache,
            ttl: cache_ttl,
        }
    }

    /// Durably create a session, then populate the cache.
    pub async fn create(&self, data: &NewSession) -> AppResult<Session> {
        let session = self.repo.create(data).await?;
        self.cache_session(&session).await;
        self.forget_user_list(session.user_id).await;
        debug!(session_id = %session.id, user_id = %session.user_id, "Session created");
        Ok(session)
    }

    /// Find a session by id, regardless of state.
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Session>> {
        let key = keys::session_by_id(id);
        match self.cache.get_json::<Session>(&key).await {
            Ok(Some(session)) => return Ok(Some(session)),
            Ok(None) => {}
            Err(e) => warn!(session_id = %id, error = %e, "Session cache read failed"),
        }

        match self.repo.find_by_id(id).await? {
            Some(s) if self.cache_session(&s).await => Ok(Some(s)),
            Some(_) => {
                debug!(session_id = %id, "Session removed during lookup");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Find the session owning a refresh token.
    ///
    /// Expired sessions are filtered out unless `include_expired` is set.
    pub async fn get_by_refresh_token(
        &self,
        token: &str,
        include_expired: bool,
    ) -> AppResult<Option<Session>> {
        let hash = refresh::digest(token);
        let session = match self.cached_id_for_refresh(&hash).await {
            Some(id) => match self.get_by_id(id).await? {
                Some(s) if s.refresh_token_hash == hash => Some(s),
                _ => self.load_by_refresh_hash(&hash).await?,
            },
            None => self.load_by_refresh_hash(&hash).await?,
        };

        Ok(session.filter(|s| include_expired || !s.is_expired()))
    }

    /// Active, unexpired sessions of a user, oldest first.
    pub async fn list_active_for_user(&self, user_id: Uuid) -> AppResult<Vec<Session>> {
        let key = keys::user_sessions(user_id);
        let sessions = match self.cache.get_json::<Vec<Session>>(&key).await {
            Ok(Some(sessions)) => sessions,
            other => {
                if let Err(e) = other {
                    warn!(user_id = %user_id, error = %e, "Session list cache read failed");
                }
                let sessions = self.repo.find_active_by_user(user_id).await?;
                if let Err(e) = self.cache.set_json(&key, &sessions, self.ttl).await {
                    warn!(user_id = %user_id, error = %e, "Session list cache write failed");
                }

                let mut removed = Vec::new();
                for session in &sessions {
                    if self.is_removed(session.id).await {
                        removed.push(session.id);
                    }
                }
                if removed.is_empty() {
                    sessions
                } else {
                    debug!(user_id = %user_id, removed = removed.len(), "Session list raced a removal");
                    self.forget_user_list(user_id).await;
                    sessions
                        .into_iter()
                        .filter(|s| !removed.contains(&s.id))
                        .collect()
                }
            }
        };

        let now = Utc::now();
        Ok(sessions
            .into_iter()
            .filter(|s| s.is_active && !s.is_expired_at(now))
            .collect())
    }

    /// Put back a session removed by [`take_by_refresh_token`] whose
    /// replacement could not be created.
    ///
    /// [`take_by_refresh_token`]: Self::take_by_refresh_token
    pub async fn restore(&self, session: &Session) -> AppResult<Session> {
        if let Err(e) = self.cache.delete(&keys::session_removed(session.id)).await {
            warn!(session_id = %session.id, error = %e, "Failed to clear session tombstone");
        }
        let restored = self
            .repo
            .create(&NewSession {
                id: session.id,
                user_id: session.user_id,
                refresh_token_hash: session.refresh_token_hash.clone(),
                fingerprint: session.fingerprint.clone(),
                ip_address: session.ip_address.clone(),
                user_agent: session.user_agent.clone(),
                device_info: session.device().cloned(),
                expires_at: session.expires_at,
            })
            .await?;
        self.cache_session(&restored).await;
        self.forget_user_list(restored.user_id).await;
        debug!(session_id = %restored.id, "Session restored");
        Ok(restored)
    }

    /// Remove a session by id.
    pub async fn delete(&self, id: Uuid) -> AppResult<Removal> {
        let removed = self.repo.delete(id).await?;
        Ok(self.invalidate_all(removed.into_iter().collect()).await)
    }

    /// Atomically remove the session owning `token`.
    ///
    /// Of several concurrent callers presenting the same token, at most one
    /// receives the session.
    pub async fn take_by_refresh_token(&self, token: &str) -> AppResult<Option<Session>> {
        let hash = refresh::digest(token);
        let taken = self.repo.take_by_refresh_hash(&hash).await?;
        if let Some(ref session) = taken {
            self.invalidate(session).await;
        }
        Ok(taken)
    }

    /// Remove every session of a user except `except`.
    pub async fn delete_all_for_user(&self, user_id: Uuid, except: Option<Uuid>) -> AppResult<Removal> {
        let removed = self.repo.delete_all_for_user(user_id, except).await?;
        let mut removal = self.invalidate_all(removed).await;
        removal.cache_invalidated &= self.forget_user_list(user_id).await;
        Ok(removal)
    }

    /// Persist a mutated session and refresh its cache entries.
    pub async fn update(&self, session: &Session) -> AppResult<Option<Session>> {
        let updated = self.repo.update(session).await?;
        match updated {
            Some(ref s) => {
                self.cache_session(s).await;
                self.forget_user_list(s.user_id).await;
            }
            None => {
                self.invalidate(session).await;
            }
        }
        Ok(updated)
    }

    /// Remove sessions that expired before `cutoff`.
    pub async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> AppResult<Removal> {
        let removed = self.repo.delete_expired_before(cutoff).await?;
        Ok(self.invalidate_all(removed).await)
    }

    /// Remember that a refresh token was rotated away from `user_id`.
    pub async fn mark_refresh_spent(&self, token_hash: &str, user_id: Uuid, ttl: Duration) {
        let key = keys::spent_refresh(token_hash);
        if let Err(e) = self.cache.set(&key, &user_id.to_string(), ttl).await {
            warn!(user_id = %user_id, error = %e, "Failed to record spent refresh token");
        }
    }

    /// Owner of a previously rotated refresh token, if remembered.
    pub async fn spent_refresh_owner(&self, token: &str) -> Option<Uuid> {
        let key = keys::spent_refresh(&refresh::digest(token));
        match self.cache.get(&key).await {
            Ok(Some(value)) => Uuid::parse_str(&value).ok(),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read spent refresh marker");
                None
            }
        }
    }

    /// Tombstone a removed session and clear every cache entry derived from
    /// it. Returns whether all cache writes succeeded.
    pub async fn invalidate(&self, session: &Session) -> bool {
        let mut ok = true;
        if let Err(e) = self
            .cache
            .set(&keys::session_removed(session.id), "1", self.ttl)
            .await
        {
            warn!(
                session_id = %session.id,
                security_event = true,
                error = %e,
                "Failed to record session tombstone"
            );
            ok = false;
        }

        let keys = [
            keys::session_by_id(session.id),
            keys::session_by_refresh(&session.refresh_token_hash),
            keys::user_sessions(session.user_id),
        ];
        for key in &keys {
            if let Err(e) = self.cache.delete(key).await {
                warn!(
                    session_id = %session.id,
                    security_event = true,
                    error = %e,
                    "Failed to invalidate session cache entry"
                );
                ok = false;
            }
        }
        ok
    }

    async fn invalidate_all(&self, sessions: Vec<Session>) -> Removal {
        let mut cache_invalidated = true;
        for session in &sessions {
            cache_invalidated &= self.invalidate(session).await;
        }
        Removal {
            sessions,
            cache_invalidated,
        }
    }

    async fn cached_id_for_refresh(&self, hash: &str) -> Option<Uuid> {
        match self.cache.get(&keys::session_by_refresh(hash)).await {
            Ok(value) => value.and_then(|v| Uuid::parse_str(&v).ok()),
            Err(e) => {
                warn!(error = %e, "Refresh index cache read failed");
                None
            }
        }
    }

    async fn load_by_refresh_hash(&self, hash: &str) -> AppResult<Option<Session>> {
        match self.repo.find_by_refresh_hash(hash).await? {
            Some(s) if self.cache_session(&s).await => Ok(Some(s)),
            _ => Ok(None),
        }
    }

    /// Whether `id` was removed within the cache TTL. Unreadable tombstones
    /// count as absent.
    async fn is_removed(&self, id: Uuid) -> bool {
        match self.cache.exists(&keys::session_removed(id)).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(session_id = %id, error = %e, "Session tombstone read failed");
                false
            }
        }
    }

    /// Write the id and refresh projections. Returns `false`, leaving nothing
    /// cached, when the session was removed meanwhile.
    async fn cache_session(&self, session: &Session) -> bool {
        let remaining = (session.expires_at - Utc::now())
            .to_std()
            .unwrap_or(Duration::from_secs(1));
        let ttl = self.ttl.min(remaining).max(Duration::from_secs(1));

        if let Err(e) = self
            .cache
            .set_json(&keys::session_by_id(session.id), session, ttl)
            .await
        {
            warn!(session_id = %session.id, error = %e, "Session cache write failed");
        }
        if let Err(e) = self
            .cache
            .set(
                &keys::session_by_refresh(&session.refresh_token_hash),
                &session.id.to_string(),
                ttl,
            )
            .await
        {
            warn!(session_id = %session.id, error = %e, "Refresh index cache write failed");
        }

        if !self.is_removed(session.id).await {
            return true;
        }
        for key in [
            keys::session_by_id(session.id),
            keys::session_by_refresh(&session.refresh_token_hash),
        ] {
            if let Err(e) = self.cache.delete(&key).await {
                warn!(session_id = %session.id, error = %e, "Failed to drop raced session cache entry");
            }
        }
        false
    }

    async fn forget_user_list(&self, user_id: Uuid) -> bool {
        match self.cache.delete(&keys::user_sessions(user_id)).await {
            Ok(()) => true,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Failed to invalidate session list");
                false
            }
        }
    }
}
