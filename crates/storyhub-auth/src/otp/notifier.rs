//! Delivery seam for out-of-band codes and links.

use async_trait::async_trait;
use tracing::info;

use storyhub_core::result::AppResult;

use super::service::OtpPurpose;
use crate::token::TokenType;

/// Delivers one-time passcodes and account tokens to their recipient.
///
/// Email and SMS clients implement this outside the session subsystem.
#[async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug + 'static {
    /// Deliver `code` to `subject` (an email address or mobile number).
    async fn send_otp(&self, subject: &str, purpose: OtpPurpose, code: &str) -> AppResult<()>;

    /// Deliver an account token (reset or confirmation link) to `email`.
    async fn send_account_token(
        &self,
        email: &str,
        token_type: TokenType,
        token: &str,
    ) -> AppResult<()>;
}

/// Notifier that records deliveries in the log without their secrets.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_otp(&self, subject: &str, purpose: OtpPurpose, _code: &str) -> AppResult<()> {
        info!(subject = %subject, purpose = %purpose, "One-time passcode issued");
        Ok(())
    }

    async fn send_account_token(
        &self,
        email: &str,
        token_type: TokenType,
        _token: &str,
    ) -> AppResult<()> {
        info!(email = %email, token_type = %token_type, "Account token issued");
        Ok(())
    }
}
