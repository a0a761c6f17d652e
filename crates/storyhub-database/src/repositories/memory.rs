//! In-memory repositories for single-node deployments and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use storyhub_core::error::AppError;
use storyhub_core::result::AppResult;
use storyhub_entity::session::{NewSession, Session};
use storyhub_entity::user::{User, UserStatus};

use super::{SessionRepository, UserDirectory};

/// Session repository held in process memory.
///
/// The refresh digest index is the serialization point: removing an
/// index entry is atomic, so only one caller can take a given digest.
#[derive(Debug, Default)]
pub struct MemorySessionRepository {
    sessions: DashMap<Uuid, Session>,
    by_refresh: DashMap<String, Uuid>,
}

impl MemorySessionRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions in any state.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are stored.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn unindex(&self, session: &Session) {
        self.by_refresh
            .remove_if(&session.refresh_token_hash, |_, id| *id == session.id);
    }

    fn remove_where(&self, predicate: impl Fn(&Session) -> bool) -> Vec<Session> {
        let ids: Vec<Uuid> = self
            .sessions
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| *entry.key())
            .collect();

        ids.into_iter()
            .filter_map(|id| self.sessions.remove(&id).map(|(_, session)| session))
            .inspect(|session| self.unindex(session))
            .collect()
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn create(&self, data: &NewSession) -> AppResult<Session> {
        match self.by_refresh.entry(data.refresh_token_hash.clone()) {
            Entry::Occupied(_) => return Err(AppError::conflict("Session already exists")),
            Entry::Vacant(slot) => {
                slot.insert(data.id);
            }
        }
        let session = data.clone().into_session(Utc::now());
        self.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Session>> {
        Ok(self.sessions.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_by_refresh_hash(&self, hash: &str) -> AppResult<Option<Session>> {
        let Some(id) = self.by_refresh.get(hash).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        self.find_by_id(id).await
    }

    async fn find_active_by_user(&self, user_id: Uuid) -> AppResult<Vec<Session>> {
        let now = Utc::now();
        let mut sessions: Vec<Session> = self
            .sessions
            .iter()
            .filter(|entry| {
                let s = entry.value();
                s.user_id == user_id && s.is_active && !s.is_expired_at(now)
            })
            .map(|entry| entry.value().clone())
            .collect();
        sessions.sort_by_key(|s| s.created_at);
        Ok(sessions)
    }

    async fn delete(&self, id: Uuid) -> AppResult<Option<Session>> {
        let removed = self.sessions.remove(&id).map(|(_, session)| session);
        if let Some(session) = &removed {
            self.unindex(session);
        }
        Ok(removed)
    }

    async fn take_by_refresh_hash(&self, hash: &str) -> AppResult<Option<Session>> {
        let Some((_, id)) = self.by_refresh.remove(hash) else {
            return Ok(None);
        };
        Ok(self.sessions.remove(&id).map(|(_, session)| session))
    }

    async fn delete_all_for_user(
        &self,
        user_id: Uuid,
        except: Option<Uuid>,
    ) -> AppResult<Vec<Session>> {
        Ok(self.remove_where(|s| s.user_id == user_id && Some(s.id) != except))
    }

    async fn update(&self, session: &Session) -> AppResult<Option<Session>> {
        let Some(mut stored) = self.sessions.get_mut(&session.id) else {
            return Ok(None);
        };
        stored.expires_at = session.expires_at;
        stored.last_activity_at = session.last_activity_at;
        stored.is_active = session.is_active;
        stored.security_level = session.security_level;
        stored.device_info = session.device_info.clone();
        Ok(Some(stored.clone()))
    }

    async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Session>> {
        Ok(self.remove_where(|s| s.expires_at < cutoff))
    }
}

/// User directory held in process memory.
#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    users: DashMap<Uuid, User>,
}

impl MemoryUserDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a user.
    pub fn insert(&self, user: User) {
        self.users.insert(user.id, user);
    }

    fn modify(&self, id: Uuid, f: impl FnOnce(&mut User)) -> AppResult<()> {
        let mut user = self
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))?;
        f(user.value_mut());
        user.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn get_user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.value().email.eq_ignore_ascii_case(email))
            .map(|entry| entry.value().clone()))
    }

    async fn activate(&self, id: Uuid) -> AppResult<()> {
        self.modify(id, |user| {
            user.status = UserStatus::Active;
            user.email_verified = true;
        })
    }

    async fn set_email_verified(&self, id: Uuid) -> AppResult<()> {
        self.modify(id, |user| user.email_verified = true)
    }

    async fn update_email(&self, id: Uuid, email: &str) -> AppResult<()> {
        let taken = self
            .users
            .iter()
            .any(|entry| entry.key() != &id && entry.value().email.eq_ignore_ascii_case(email));
        if taken {
            return Err(AppError::conflict("Email already in use"));
        }
        self.modify(id, |user| {
            user.email = email.to_string();
            user.email_verified = true;
        })
    }

    async fn update_mobile(&self, id: Uuid, mobile: &str) -> AppResult<()> {
        self.modify(id, |user| user.mobile = Some(mobile.to_string()))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> AppResult<()> {
        self.modify(id, |user| user.password_hash = password_hash.to_string())
    }

    async fn record_logout(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        self.modify(id, |user| user.last_logout_at = Some(at))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;

    fn new_session(user_id: Uuid, hash: &str) -> NewSession {
        NewSession {
            id: Uuid::new_v4(),
            user_id,
            refresh_token_hash: hash.to_string(),
            fingerprint: "fp".to_string(),
            ip_address: "127.0.0.1".to_string(),
            user_agent: None,
            device_info: None,
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    #[tokio::test]
    async fn test_duplicate_refresh_hash_conflicts() {
        let repo = MemorySessionRepository::new();
        let user = Uuid::new_v4();
        repo.create(&new_session(user, "h1")).await.unwrap();
        let err = repo.create(&new_session(user, "h1")).await.unwrap_err();
        assert_eq!(err.kind, storyhub_core::error::ErrorKind::Conflict);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_take_yields_one_winner() {
        let repo = Arc::new(MemorySessionRepository::new());
        repo.create(&new_session(Uuid::new_v4(), "shared"))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                repo.take_by_refresh_hash("shared").await.unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_delete_all_for_user_keeps_exception() {
        let repo = MemorySessionRepository::new();
        let user = Uuid::new_v4();
        let keep = repo.create(&new_session(user, "a")).await.unwrap();
        repo.create(&new_session(user, "b")).await.unwrap();
        repo.create(&new_session(Uuid::new_v4(), "c")).await.unwrap();

        let removed = repo.delete_all_for_user(user, Some(keep.id)).await.unwrap();
        assert_eq!(removed.len(), 1);
        assert!(repo.find_by_refresh_hash("b").await.unwrap().is_none());
        assert!(repo.find_by_id(keep.id).await.unwrap().is_some());
        assert_eq!(repo.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_expired_before() {
        let repo = MemorySessionRepository::new();
        let mut stale = new_session(Uuid::new_v4(), "old");
        stale.expires_at = Utc::now() - Duration::hours(48);
        let created = repo.create(&stale).await.unwrap();
        assert!(created.expires_at < Utc::now());
        repo.create(&new_session(Uuid::new_v4(), "fresh"))
            .await
            .unwrap();

        let removed = repo
            .delete_expired_before(Utc::now() - Duration::hours(24))
            .await
            .unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].refresh_token_hash, "old");
        assert!(repo.find_by_refresh_hash("old").await.unwrap().is_none());
    }
}
