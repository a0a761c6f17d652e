//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use storyhub_auth::{AccountService, OtpService, SessionManager};
use storyhub_cache::CacheManager;
use storyhub_core::config::AppConfig;
use storyhub_realtime::QrLoginBroker;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Cache manager (Redis or in-memory)
    pub cache: Arc<CacheManager>,
    /// Session lifecycle manager
    pub session_manager: Arc<SessionManager>,
    /// Password reset and email confirmation
    pub accounts: Arc<AccountService>,
    /// One-time passcode issuance and confirmation
    pub otp: Arc<OtpService>,
    /// QR pairing login broker
    pub qr_broker: Arc<QrLoginBroker>,
}
