//! PostgreSQL user directory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use storyhub_core::error::{AppError, ErrorKind};
use storyhub_core::result::AppResult;
use storyhub_entity::user::User;

use super::UserDirectory;

/// User directory over the `users` table.
#[derive(Debug, Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    /// Create a new user directory.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn execute_update(&self, id: Uuid, query: &'static str, what: &str) -> AppResult<()> {
        let result = sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, format!("Failed to {what}"), e)
            })?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("User {id} not found")));
        }
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn get_user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find user by id", e))
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find user by email", e)
            })
    }

    async fn activate(&self, id: Uuid) -> AppResult<()> {
        self.execute_update(
            id,
            "UPDATE users SET status = 'active', email_verified = TRUE, updated_at = NOW() \
             WHERE id = $1",
            "activate user",
        )
        .await
    }

    async fn set_email_verified(&self, id: Uuid) -> AppResult<()> {
        self.execute_update(
            id,
            "UPDATE users SET email_verified = TRUE, updated_at = NOW() WHERE id = $1",
            "verify email",
        )
        .await
    }

    async fn update_email(&self, id: Uuid, email: &str) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE users SET email = $2, email_verified = TRUE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(email)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::with_source(ErrorKind::Conflict, "Email already in use", e)
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to update email", e),
        })?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("User {id} not found")));
        }
        Ok(())
    }

    async fn update_mobile(&self, id: Uuid, mobile: &str) -> AppResult<()> {
        let result =
            sqlx::query("UPDATE users SET mobile = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(mobile)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to update mobile", e)
                })?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("User {id} not found")));
        }
        Ok(())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> AppResult<()> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to update password", e)
                })?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("User {id} not found")));
        }
        Ok(())
    }

    async fn record_logout(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_logout_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to record logout", e)
            })?;
        Ok(())
    }
}
