//! Repository traits for sessions and users, with PostgreSQL and
//! in-memory implementations.

pub mod memory;
pub mod session;
pub mod user;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use storyhub_core::result::AppResult;
use storyhub_entity::session::{NewSession, Session};
use storyhub_entity::user::User;

pub use memory::{MemorySessionRepository, MemoryUserDirectory};
pub use session::PgSessionRepository;
pub use user::PgUserDirectory;

/// Durable session storage.
///
/// Every removal returns the removed rows so callers can invalidate the
/// secondary cache indices derived from them.
#[async_trait]
pub trait SessionRepository: Send + Sync + std::fmt::Debug + 'static {
    /// Insert a session in a single write. Fails with `Conflict` when the
    /// refresh token digest is already taken.
    async fn create(&self, data: &NewSession) -> AppResult<Session>;

    /// Find a session by id, regardless of state.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Session>>;

    /// Find a session by refresh token digest, regardless of state.
    async fn find_by_refresh_hash(&self, hash: &str) -> AppResult<Option<Session>>;

    /// Active, unexpired sessions of a user, oldest first.
    async fn find_active_by_user(&self, user_id: Uuid) -> AppResult<Vec<Session>>;

    /// Remove one session and return it.
    async fn delete(&self, id: Uuid) -> AppResult<Option<Session>>;

    /// Atomically remove the session owning `hash` and return it.
    ///
    /// Concurrent callers presenting the same digest observe at most one
    /// `Some`.
    async fn take_by_refresh_hash(&self, hash: &str) -> AppResult<Option<Session>>;

    /// Remove every session of a user except `except`, returning them.
    async fn delete_all_for_user(
        &self,
        user_id: Uuid,
        except: Option<Uuid>,
    ) -> AppResult<Vec<Session>>;

    /// Persist the mutable fields (`expires_at`, `last_activity_at`,
    /// `is_active`, `security_level`, `device_info`).
    async fn update(&self, session: &Session) -> AppResult<Option<Session>>;

    /// Remove sessions that expired before `cutoff`, returning them.
    async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Session>>;
}

/// User lookup and the few account mutations the session flows perform.
#[async_trait]
pub trait UserDirectory: Send + Sync + std::fmt::Debug + 'static {
    /// Find a user by id.
    async fn get_user_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find a user by email (case-insensitive).
    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Move a pending user to active and mark the email verified.
    async fn activate(&self, id: Uuid) -> AppResult<()>;

    /// Mark the user's email as verified.
    async fn set_email_verified(&self, id: Uuid) -> AppResult<()>;

    /// Replace the user's email. The new address is verified by the caller.
    async fn update_email(&self, id: Uuid, email: &str) -> AppResult<()>;

    /// Replace the user's mobile number.
    async fn update_mobile(&self, id: Uuid, mobile: &str) -> AppResult<()>;

    /// Replace the stored password hash.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> AppResult<()>;

    /// Record a logout of every device.
    async fn record_logout(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()>;
}
