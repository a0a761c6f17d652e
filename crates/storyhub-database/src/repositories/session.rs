//! PostgreSQL session repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use storyhub_core::error::{AppError, ErrorKind};
use storyhub_core::result::AppResult;
use storyhub_entity::session::{NewSession, Session};

use super::SessionRepository;

/// Session repository over the `sessions` table.
#[derive(Debug, Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    /// Create a new session repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn create(&self, data: &NewSession) -> AppResult<Session> {
        sqlx::query_as::<_, Session>(
            "INSERT INTO sessions (id, user_id, refresh_token_hash, fingerprint, ip_address, \
             user_agent, device_info, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(data.id)
        .bind(data.user_id)
        .bind(&data.refresh_token_hash)
        .bind(&data.fingerprint)
        .bind(&data.ip_address)
        .bind(&data.user_agent)
        .bind(data.device_info.clone().map(Json))
        .bind(data.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::with_source(ErrorKind::Conflict, "Session already exists", e)
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to create session", e),
        })
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find session", e))
    }

    async fn find_by_refresh_hash(&self, hash: &str) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE refresh_token_hash = $1")
            .bind(hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    "Failed to find session by refresh token",
                    e,
                )
            })
    }

    async fn find_active_by_user(&self, user_id: Uuid) -> AppResult<Vec<Session>> {
        sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE user_id = $1 AND is_active AND expires_at > NOW() \
             ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find active sessions", e)
        })
    }

    async fn delete(&self, id: Uuid) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>("DELETE FROM sessions WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete session", e))
    }

    async fn take_by_refresh_hash(&self, hash: &str) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>(
            "DELETE FROM sessions WHERE refresh_token_hash = $1 RETURNING *",
        )
        .bind(hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to rotate session", e)
        })
    }

    async fn delete_all_for_user(
        &self,
        user_id: Uuid,
        except: Option<Uuid>,
    ) -> AppResult<Vec<Session>> {
        sqlx::query_as::<_, Session>(
            "DELETE FROM sessions WHERE user_id = $1 AND ($2::uuid IS NULL OR id <> $2) \
             RETURNING *",
        )
        .bind(user_id)
        .bind(except)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to delete user sessions", e)
        })
    }

    async fn update(&self, session: &Session) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>(
            "UPDATE sessions SET expires_at = $2, last_activity_at = $3, is_active = $4, \
             security_level = $5, device_info = $6 WHERE id = $1 RETURNING *",
        )
        .bind(session.id)
        .bind(session.expires_at)
        .bind(session.last_activity_at)
        .bind(session.is_active)
        .bind(session.security_level)
        .bind(&session.device_info)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update session", e))
    }

    async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Session>> {
        sqlx::query_as::<_, Session>("DELETE FROM sessions WHERE expires_at < $1 RETURNING *")
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete expired sessions", e)
            })
    }
}
