//! Authentication error taxonomy.
//!
//! Every failure leaving the lifecycle services is one of these variants.
//! Security-class variants are collapsed into an opaque authentication
//! failure when converted to [`AppError`]; the detailed reason is logged
//! where the failure is detected.

use storyhub_core::error::{AppError, ErrorKind};
use thiserror::Error;

use crate::token::TokenError;

/// Result alias for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Classified authentication failures.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A token was well-formed and correctly signed but has expired.
    #[error("token expired")]
    TokenExpired,
    /// A token was malformed, tampered with, or of the wrong class.
    #[error("token invalid")]
    TokenInvalid,
    /// No live session matches the presented identifier or refresh token.
    #[error("session not found")]
    SessionNotFound,
    /// The presented device binding does not match the session.
    #[error("session verification failed")]
    FingerprintMismatch,
    /// A one-time passcode did not verify.
    #[error("one-time passcode invalid")]
    OtpInvalid,
    /// The session was force-expired by security validation.
    #[error("session compromised")]
    SessionCompromised,
    /// Unknown account or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// The user is at the session limit and policy denies new logins.
    #[error("session limit exceeded")]
    SessionLimitExceeded,
    /// Too many failed attempts.
    #[error("too many attempts")]
    RateLimited,
    /// Bad caller input.
    #[error("{0}")]
    Validation(String),
    /// The user referenced by a valid token no longer exists.
    #[error("user not found")]
    UserNotFound,
    /// Infrastructure failure.
    #[error(transparent)]
    Internal(#[from] AppError),
}

impl AuthError {
    /// Whether the caller can recover by refreshing, resending, or retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TokenExpired | Self::OtpInvalid | Self::RateLimited | Self::Internal(_)
        )
    }

    /// Whether the failure must be treated as a security event.
    pub fn is_security_event(&self) -> bool {
        matches!(
            self,
            Self::TokenInvalid | Self::FingerprintMismatch | Self::SessionCompromised
        )
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Self::TokenExpired,
            TokenError::Invalid => Self::TokenInvalid,
            TokenError::Signing(e) => Self::Internal(AppError::internal(format!(
                "Failed to sign token: {e}"
            ))),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(message) => AppError::validation(message),
            AuthError::TokenExpired => AppError::authentication("Token expired"),
            AuthError::OtpInvalid => AppError::authentication("Invalid code"),
            AuthError::InvalidCredentials => AppError::authentication("Invalid email or password"),
            AuthError::SessionNotFound
            | AuthError::TokenInvalid
            | AuthError::FingerprintMismatch
            | AuthError::SessionCompromised
            | AuthError::UserNotFound => AppError::authentication("Authentication failed"),
            AuthError::SessionLimitExceeded => {
                AppError::new(ErrorKind::Conflict, "Session limit reached")
            }
            AuthError::RateLimited => AppError::rate_limited("Too many attempts"),
            AuthError::Internal(inner) => inner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_errors_are_opaque() {
        for err in [
            AuthError::FingerprintMismatch,
            AuthError::SessionCompromised,
            AuthError::TokenInvalid,
            AuthError::SessionNotFound,
        ] {
            let app: AppError = err.into();
            assert_eq!(app.kind, ErrorKind::Authentication);
            assert_eq!(app.message, "Authentication failed");
        }
    }

    #[test]
    fn test_validation_passes_through() {
        let app: AppError = AuthError::Validation("fingerprint is required".into()).into();
        assert_eq!(app.kind, ErrorKind::Validation);
        assert_eq!(app.message, "fingerprint is required");
    }

    #[test]
    fn test_classification() {
        assert!(AuthError::TokenExpired.is_retryable());
        assert!(!AuthError::TokenInvalid.is_retryable());
        assert!(AuthError::TokenInvalid.is_security_event());
        assert!(!AuthError::FingerprintMismatch.is_retryable());
        assert!(AuthError::FingerprintMismatch.is_security_event());
        assert!(!AuthError::SessionNotFound.is_security_event());
    }
}
