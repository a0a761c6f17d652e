//! Account flows built on account tokens: password reset and email
//! confirmation.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use storyhub_cache::{CacheManager, keys};
use storyhub_core::traits::CacheProvider;
use storyhub_database::UserDirectory;

use crate::error::{AuthError, AuthResult};
use crate::otp::Notifier;
use crate::password::PasswordHasher;
use crate::token::{AccountGrant, AccountTokens, TokenType};

use super::manager::{LogoutOutcome, SessionManager};

/// Password reset and email confirmation.
#[derive(Clone)]
pub struct AccountService {
    tokens: AccountTokens,
    cache: Arc<CacheManager>,
    users: Arc<dyn UserDirectory>,
    hasher: Arc<PasswordHasher>,
    sessions: Arc<SessionManager>,
    notifier: Arc<dyn Notifier>,
    password_min_length: usize,
}

impl std::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService")
            .field("password_min_length", &self.password_min_length)
            .finish()
    }
}

impl AccountService {
    /// Creates the service.
    pub fn new(
        tokens: AccountTokens,
        cache: Arc<CacheManager>,
        users: Arc<dyn UserDirectory>,
        hasher: Arc<PasswordHasher>,
        sessions: Arc<SessionManager>,
        notifier: Arc<dyn Notifier>,
        password_min_length: usize,
    ) -> Self {
        Self {
            tokens,
            cache,
            users,
            hasher,
            sessions,
            notifier,
            password_min_length,
        }
    }

    /// Send a password reset token to `email` if the account exists.
    ///
    /// Unknown addresses succeed silently.
    pub async fn forgot_password(&self, email: &str) -> AuthResult<()> {
        let Some(user) = self.users.get_user_by_email(email.trim()).await? else {
            info!(email = %email, "Password reset requested for unknown account");
            return Ok(());
        };

        let token = self.tokens.issue_reset_password(&user)?;
        self.notifier
            .send_account_token(&user.email, TokenType::ResetPassword, &token)
            .await?;
        info!(user_id = %user.id, "Password reset token issued");
        Ok(())
    }

    /// Set a new password using a reset token, then log out every device.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> AuthResult<LogoutOutcome> {
        if new_password.chars().count() < self.password_min_length {
            return Err(AuthError::Validation(format!(
                "Password must be at least {} characters",
                self.password_min_length
            )));
        }

        let grant = self.tokens.verify_reset_password(token)?;
        let user = self
            .users
            .get_user_by_id(grant.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if grant.email.as_deref().is_some_and(|e| !e.eq_ignore_ascii_case(&user.email)) {
            warn!(
                security_event = true,
                user_id = %user.id,
                "Password reset token issued for a previous email address"
            );
            return Err(AuthError::TokenInvalid);
        }

        self.redeem(&grant).await?;
        let hash = self.hasher.hash(new_password).await?;
        self.users.update_password(user.id, &hash).await?;
        let outcome = self.sessions.logout_all(user.id).await?;

        info!(
            user_id = %user.id,
            sessions = outcome.sessions_invalidated,
            "Password reset"
        );
        Ok(outcome)
    }

    /// Send an email confirmation token to the user's current address.
    pub async fn request_email_confirmation(&self, user_id: uuid::Uuid) -> AuthResult<()> {
        let user = self
            .users
            .get_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if user.email_verified {
            return Ok(());
        }

        let token = self.tokens.issue_email_confirm(&user)?;
        self.notifier
            .send_account_token(&user.email, TokenType::EmailConfirm, &token)
            .await?;
        Ok(())
    }

    /// Mark the user's email verified using a confirmation token.
    pub async fn confirm_email(&self, token: &str) -> AuthResult<()> {
        let grant = self.tokens.verify_email_confirm(token)?;
        let user = self
            .users
            .get_user_by_id(grant.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if grant.email.as_deref().is_some_and(|e| !e.eq_ignore_ascii_case(&user.email)) {
            return Err(AuthError::TokenInvalid);
        }

        self.users.set_email_verified(user.id).await?;
        info!(user_id = %user.id, "Email confirmed");
        Ok(())
    }

    /// Claim a single-use token. The marker lives until the token expires.
    async fn redeem(&self, grant: &AccountGrant) -> AuthResult<()> {
        let remaining = (grant.expires_at - Utc::now().timestamp()).max(1) as u64;
        let claimed = self
            .cache
            .set_nx(
                &keys::consumed_token(grant.token_id),
                &grant.user_id.to_string(),
                Duration::from_secs(remaining),
            )
            .await?;
        if !claimed {
            warn!(
                security_event = true,
                user_id = %grant.user_id,
                token_id = %grant.token_id,
                "Account token replayed"
            );
            return Err(AuthError::TokenInvalid);
        }
        Ok(())
    }
}
