//! # storyhub-auth
//!
//! The session and token lifecycle for StoryHub.
//!
//! ## Modules
//!
//! - `token`: signed token classes, opaque refresh tokens, account tokens
//! - `otp`: time-windowed one-time passcodes and their confirmation flows
//! - `password`: async Argon2id hashing
//! - `security`: session risk scoring and IP reputation sources
//! - `session`: the cache-backed session store, lifecycle manager, and
//!   retention cleanup
//! - `error`: the authentication error taxonomy

pub mod error;
pub mod otp;
pub mod password;
pub mod security;
pub mod session;
pub mod token;

pub use error::{AuthError, AuthResult};
pub use otp::{LogNotifier, Notifier, OtpCodec, OtpConfirmation, OtpOutcome, OtpPurpose, OtpService};
pub use password::PasswordHasher;
pub use security::{NoopIpReputation, SecurityReport, SecurityValidator, Severity, StaticIpReputation};
pub use session::{
    AccountService, ClientContext, LoginResult, LogoutOutcome, SessionCleanup, SessionManager,
    SessionStore,
};
pub use token::{AccountTokens, TokenClaims, TokenCodec, TokenCodecs, TokenError, TokenType};
