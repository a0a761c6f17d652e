//! OTP issuance and confirmation flows.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::ValidateEmail;

use storyhub_cache::CacheManager;
use storyhub_cache::keys;
use storyhub_core::config::OtpConfig;
use storyhub_core::traits::CacheProvider;
use storyhub_database::UserDirectory;
use storyhub_entity::user::UserStatus;

use crate::error::{AuthError, AuthResult};
use crate::session::{ClientContext, LoginResult, SessionManager};

use super::codec::OtpCodec;
use super::notifier::Notifier;

/// What a one-time passcode authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    /// Activate a pending account. The subject is its email.
    Registration,
    /// Move the caller's account to a new email. The subject is the new email.
    EmailChange,
    /// Move the caller's account to a new mobile number.
    MobileChange,
}

impl OtpPurpose {
    /// Stable string form used in cache keys and code derivation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::EmailChange => "email_change",
            Self::MobileChange => "mobile_change",
        }
    }

    fn expects_email(&self) -> bool {
        matches!(self, Self::Registration | Self::EmailChange)
    }
}

impl std::fmt::Display for OtpPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A code presented for confirmation.
#[derive(Debug, Clone)]
pub struct OtpConfirmation {
    /// The code as typed.
    pub code: String,
    /// Email or mobile number the code was sent to.
    pub subject: String,
    /// What the code authorizes.
    pub purpose: OtpPurpose,
    /// Authenticated caller. Required for email and mobile changes.
    pub user_id: Option<Uuid>,
    /// Client binding for the session created on registration.
    pub client: ClientContext,
}

/// Result of a successful confirmation.
#[derive(Debug, Clone)]
pub enum OtpOutcome {
    /// The account was activated and logged in.
    Registered(Box<LoginResult>),
    /// The caller's email was replaced.
    EmailChanged,
    /// The caller's mobile number was replaced.
    MobileChanged,
}

/// Issues and confirms one-time passcodes.
#[derive(Clone)]
pub struct OtpService {
    codec: OtpCodec,
    cache: Arc<CacheManager>,
    users: Arc<dyn UserDirectory>,
    sessions: Arc<SessionManager>,
    notifier: Arc<dyn Notifier>,
    config: OtpConfig,
}

impl std::fmt::Debug for OtpService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtpService")
            .field("codec", &self.codec)
            .field("max_attempts", &self.config.max_attempts)
            .finish()
    }
}

impl OtpService {
    /// Creates the service.
    pub fn new(
        config: OtpConfig,
        cache: Arc<CacheManager>,
        users: Arc<dyn UserDirectory>,
        sessions: Arc<SessionManager>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            codec: OtpCodec::new(&config),
            cache,
            users,
            sessions,
            notifier,
            config,
        }
    }

    /// Generate a code for `subject` and hand it to the notifier.
    ///
    /// Registration codes are only sent to accounts awaiting activation;
    /// other addresses succeed silently.
    pub async fn request(&self, subject: &str, purpose: OtpPurpose) -> AuthResult<()> {
        let subject = normalize_subject(subject, purpose)?;

        if purpose == OtpPurpose::Registration {
            let pending = self
                .users
                .get_user_by_email(&subject)
                .await?
                .is_some_and(|u| u.status == UserStatus::Pending);
            if !pending {
                info!(subject = %subject, "Registration code not sent, no pending account");
                return Ok(());
            }
        }

        let code = self
            .codec
            .generate(&scoped_subject(purpose, &subject))
            .ok_or_else(|| AuthError::Validation("Subject is required".into()))?;
        self.notifier.send_otp(&subject, purpose, &code).await?;
        Ok(())
    }

    /// Verify a code and carry out what it authorizes.
    pub async fn confirm(&self, confirmation: OtpConfirmation) -> AuthResult<OtpOutcome> {
        let purpose = confirmation.purpose;
        let subject = normalize_subject(&confirmation.subject, purpose)?;
        if purpose != OtpPurpose::Registration && confirmation.user_id.is_none() {
            return Err(AuthError::Validation("Authentication required".into()));
        }

        let attempts_key = keys::otp_attempts(purpose.as_str(), &subject);
        let failures = self.failed_attempts(&attempts_key).await;
        if failures >= i64::from(self.config.max_attempts) {
            warn!(
                subject = %subject,
                purpose = %purpose,
                failures,
                "OTP confirmation rate limited"
            );
            return Err(AuthError::RateLimited);
        }

        if !self
            .codec
            .verify(&confirmation.code, &scoped_subject(purpose, &subject))
        {
            self.record_failure(&attempts_key).await;
            warn!(subject = %subject, purpose = %purpose, "Invalid one-time passcode");
            return Err(AuthError::OtpInvalid);
        }
        self.clear_failures(&attempts_key).await;

        match (purpose, confirmation.user_id) {
            (OtpPurpose::Registration, _) => {
                let result = self.complete_registration(&subject, confirmation.client).await?;
                Ok(OtpOutcome::Registered(Box::new(result)))
            }
            (OtpPurpose::EmailChange, Some(user_id)) => {
                self.users.update_email(user_id, &subject).await?;
                self.users.set_email_verified(user_id).await?;
                info!(user_id = %user_id, "Email changed");
                Ok(OtpOutcome::EmailChanged)
            }
            (OtpPurpose::MobileChange, Some(user_id)) => {
                self.users.update_mobile(user_id, &subject).await?;
                info!(user_id = %user_id, "Mobile number changed");
                Ok(OtpOutcome::MobileChanged)
            }
            (_, None) => Err(AuthError::Validation("Authentication required".into())),
        }
    }

    async fn complete_registration(
        &self,
        email: &str,
        client: ClientContext,
    ) -> AuthResult<LoginResult> {
        let user = self
            .users
            .get_user_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        match user.status {
            UserStatus::Pending => {
                self.users.activate(user.id).await?;
                info!(user_id = %user.id, "Account activated");
            }
            UserStatus::Active => {}
            UserStatus::Inactive => return Err(AuthError::InvalidCredentials),
        }

        self.sessions.login(user.id, client).await
    }

    async fn failed_attempts(&self, key: &str) -> i64 {
        match self.cache.get(key).await {
            Ok(Some(value)) => value.trim().parse().unwrap_or(0),
            Ok(None) => 0,
            Err(e) => {
                warn!(error = %e, "Failed to read OTP attempt counter");
                0
            }
        }
    }

    async fn record_failure(&self, key: &str) {
        let window = Duration::from_secs(self.config.attempt_window_seconds.max(1));
        match self.cache.incr(key).await {
            Ok(1) => {
                if let Err(e) = self.cache.expire(key, window).await {
                    warn!(error = %e, "Failed to set OTP attempt window");
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Failed to count OTP attempt"),
        }
    }

    async fn clear_failures(&self, key: &str) {
        if let Err(e) = self.cache.delete(key).await {
            warn!(error = %e, "Failed to clear OTP attempt counter");
        }
    }
}

/// Codes are derived per purpose so a code sent for one flow never
/// confirms another.
fn scoped_subject(purpose: OtpPurpose, subject: &str) -> String {
    format!("{}:{subject}", purpose.as_str())
}

fn normalize_subject(subject: &str, purpose: OtpPurpose) -> AuthResult<String> {
    let subject = subject.trim();
    if purpose.expects_email() {
        if !subject.validate_email() {
            return Err(AuthError::Validation("A valid email address is required".into()));
        }
        return Ok(subject.to_lowercase());
    }

    let digits = subject.strip_prefix('+').unwrap_or(subject);
    if !(6..=15).contains(&digits.len()) || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AuthError::Validation("A valid mobile number is required".into()));
    }
    Ok(subject.to_string())
}
