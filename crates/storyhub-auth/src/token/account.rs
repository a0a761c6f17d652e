//! Account tokens: password reset, email confirmation, device update.

use uuid::Uuid;

use storyhub_entity::user::User;

use super::claims::TokenClaims;
use super::codec::{TokenCodecs, TokenError};

/// Issue and verify helpers for the account token classes.
#[derive(Debug, Clone)]
pub struct AccountTokens {
    codecs: TokenCodecs,
}

/// A verified account token reduced to the fields its flow needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountGrant {
    /// Account the token was issued to.
    pub user_id: Uuid,
    /// Email at issuance.
    pub email: Option<String>,
    /// Session bound by device-update grants.
    pub session_id: Option<Uuid>,
    /// Unique token id, for single-use redemption.
    pub token_id: Uuid,
    /// Expiry (seconds since epoch).
    pub expires_at: i64,
}

impl AccountTokens {
    /// Create the helpers over an existing codec set.
    pub fn new(codecs: TokenCodecs) -> Self {
        Self { codecs }
    }

    /// Mint a password reset token for `user`.
    pub fn issue_reset_password(&self, user: &User) -> Result<String, TokenError> {
        self.codecs
            .reset_password
            .sign(TokenClaims::new(user.id.to_string()).with_email(&user.email))
    }

    /// Verify a password reset token.
    pub fn verify_reset_password(&self, token: &str) -> Result<AccountGrant, TokenError> {
        grant(self.codecs.reset_password.verify(token)?)
    }

    /// Mint an email confirmation token for `user`.
    pub fn issue_email_confirm(&self, user: &User) -> Result<String, TokenError> {
        self.codecs
            .email_confirm
            .sign(TokenClaims::new(user.id.to_string()).with_email(&user.email))
    }

    /// Verify an email confirmation token.
    pub fn verify_email_confirm(&self, token: &str) -> Result<AccountGrant, TokenError> {
        grant(self.codecs.email_confirm.verify(token)?)
    }

    /// Mint a grant to update the device metadata of one session.
    pub fn issue_device_update(&self, user_id: Uuid, session_id: Uuid) -> Result<String, TokenError> {
        self.codecs
            .device_update
            .sign(TokenClaims::new(user_id.to_string()).with_session(session_id))
    }

    /// Verify a device update grant. The grant must name a session.
    pub fn verify_device_update(&self, token: &str) -> Result<AccountGrant, TokenError> {
        let grant = grant(self.codecs.device_update.verify(token)?)?;
        if grant.session_id.is_none() {
            return Err(TokenError::Invalid);
        }
        Ok(grant)
    }
}

fn grant(claims: TokenClaims) -> Result<AccountGrant, TokenError> {
    let user_id = claims.user_id().ok_or(TokenError::Invalid)?;
    Ok(AccountGrant {
        user_id,
        email: claims.email,
        session_id: claims.session_id,
        token_id: claims.jti,
        expires_at: claims.exp,
    })
}
