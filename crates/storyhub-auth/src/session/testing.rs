//! Session repository wrapper with injectable failures and pauses.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use uuid::Uuid;

use storyhub_core::error::AppError;
use storyhub_core::result::AppResult;
use storyhub_database::SessionRepository;
use storyhub_database::repositories::MemorySessionRepository;
use storyhub_entity::session::{NewSession, Session};

/// In-memory repository whose next create can be made to fail and whose
/// next lookup can be held between reading the row and returning it.
#[derive(Debug, Default)]
pub(crate) struct ScriptedRepository {
    inner: MemorySessionRepository,
    fail_create: AtomicBool,
    hold_read: AtomicBool,
    read_done: Notify,
    release: Notify,
}

impl ScriptedRepository {
    /// Fail the next `create` with a database error.
    pub(crate) fn fail_next_create(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }

    /// Hold the next `find_by_id` or `find_active_by_user` after its read.
    pub(crate) fn hold_next_read(&self) {
        self.hold_read.store(true, Ordering::SeqCst);
    }

    /// Wait until a held read has loaded its rows.
    pub(crate) async fn read_loaded(&self) {
        self.read_done.notified().await;
    }

    /// Let the held read return.
    pub(crate) fn release_read(&self) {
        self.release.notify_one();
    }

    async fn pause_if_held(&self) {
        if self.hold_read.swap(false, Ordering::SeqCst) {
            self.read_done.notify_one();
            self.release.notified().await;
        }
    }
}

#[async_trait]
impl SessionRepository for ScriptedRepository {
    async fn create(&self, data: &NewSession) -> AppResult<Session> {
        if self.fail_create.swap(false, Ordering::SeqCst) {
            return Err(AppError::database("connection reset"));
        }
        self.inner.create(data).await
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Session>> {
        let found = self.inner.find_by_id(id).await?;
        self.pause_if_held().await;
        Ok(found)
    }

    async fn find_by_refresh_hash(&self, hash: &str) -> AppResult<Option<Session>> {
        self.inner.find_by_refresh_hash(hash).await
    }

    async fn find_active_by_user(&self, user_id: Uuid) -> AppResult<Vec<Session>> {
        let found = self.inner.find_active_by_user(user_id).await?;
        self.pause_if_held().await;
        Ok(found)
    }

    async fn delete(&self, id: Uuid) -> AppResult<Option<Session>> {
        self.inner.delete(id).await
    }

    async fn take_by_refresh_hash(&self, hash: &str) -> AppResult<Option<Session>> {
        self.inner.take_by_refresh_hash(hash).await
    }

    async fn delete_all_for_user(
        &self,
        user_id: Uuid,
        except: Option<Uuid>,
    ) -> AppResult<Vec<Session>> {
        self.inner.delete_all_for_user(user_id, except).await
    }

    async fn update(&self, session: &Session) -> AppResult<Option<Session>> {
        self.inner.update(session).await
    }

    async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Session>> {
        self.inner.delete_expired_before(cutoff).await
    }
}
