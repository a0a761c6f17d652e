//! Authentication configuration: one signing profile per token class.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Algorithms accepted for signed tokens. Keyed MACs only.
pub const SUPPORTED_ALGORITHMS: [&str; 3] = ["HS256", "HS384", "HS512"];

/// Authentication and credential configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Signing profiles for every token class.
    #[serde(default)]
    pub tokens: TokenClassesConfig,
    /// Minimum password length accepted on reset.
    #[serde(default = "default_password_min")]
    pub password_min_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            tokens: TokenClassesConfig::default(),
            password_min_length: default_password_min(),
        }
    }
}

impl AuthConfig {
    /// Validate every token class profile.
    pub fn validate(&self) -> Result<(), AppError> {
        for (name, class) in self.tokens.iter() {
            class.validate(name)?;
        }
        Ok(())
    }
}

/// Per-class signing profiles.
///
/// Each class has its own secret so a token minted for one purpose never
/// verifies as another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClassesConfig {
    /// Session-bound access tokens.
    #[serde(default = "default_access")]
    pub access: TokenClassConfig,
    /// Refresh lineage. Refresh tokens are opaque; only the expiry is used,
    /// and it defines the session lifetime.
    #[serde(default = "default_refresh")]
    pub refresh: TokenClassConfig,
    /// Password-reset links.
    #[serde(default = "default_reset_password")]
    pub reset_password: TokenClassConfig,
    /// Email confirmation links.
    #[serde(default = "default_email_confirm")]
    pub email_confirm: TokenClassConfig,
    /// Device metadata update grants.
    #[serde(default = "default_device_update")]
    pub device_update: TokenClassConfig,
    /// QR pairing codes.
    #[serde(default = "default_qr_login")]
    pub qr_login: TokenClassConfig,
}

impl TokenClassesConfig {
    /// Iterate over `(name, profile)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &TokenClassConfig)> {
        [
            ("access", &self.access),
            ("refresh", &self.refresh),
            ("reset_password", &self.reset_password),
            ("email_confirm", &self.email_confirm),
            ("device_update", &self.device_update),
            ("qr_login", &self.qr_login),
        ]
        .into_iter()
    }
}

impl Default for TokenClassesConfig {
    fn default() -> Self {
        Self {
            access: default_access(),
            refresh: default_refresh(),
            reset_password: default_reset_password(),
            email_confirm: default_email_confirm(),
            device_update: default_device_update(),
            qr_login: default_qr_login(),
        }
    }
}

/// Signing profile for a single token class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClassConfig {
    /// HMAC secret.
    pub secret: String,
    /// Lifetime in seconds.
    pub expires_in_seconds: u64,
    /// `iss` claim written and required on verification.
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// One of [`SUPPORTED_ALGORITHMS`].
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
}

impl TokenClassConfig {
    fn new(secret: &str, expires_in_seconds: u64) -> Self {
        Self {
            secret: secret.to_string(),
            expires_in_seconds,
            issuer: default_issuer(),
            algorithm: default_algorithm(),
        }
    }

    /// Validate this profile. `name` is used in error messages.
    pub fn validate(&self, name: &str) -> Result<(), AppError> {
        if self.secret.trim().is_empty() {
            return Err(AppError::configuration(format!(
                "auth.tokens.{name}.secret must not be empty"
            )));
        }
        if self.expires_in_seconds == 0 {
            return Err(AppError::configuration(format!(
                "auth.tokens.{name}.expires_in_seconds must be positive"
            )));
        }
        if !SUPPORTED_ALGORITHMS.contains(&self.algorithm.as_str()) {
            return Err(AppError::configuration(format!(
                "auth.tokens.{name}.algorithm '{}' is not supported; use one of {:?}",
                self.algorithm, SUPPORTED_ALGORITHMS
            )));
        }
        Ok(())
    }
}

fn default_access() -> TokenClassConfig {
    TokenClassConfig::new("CHANGE_ME_ACCESS", 15 * 60)
}

fn default_refresh() -> TokenClassConfig {
    TokenClassConfig::new("CHANGE_ME_REFRESH", 30 * 24 * 3600)
}

fn default_reset_password() -> TokenClassConfig {
    TokenClassConfig::new("CHANGE_ME_RESET_PASSWORD", 3600)
}

fn default_email_confirm() -> TokenClassConfig {
    TokenClassConfig::new("CHANGE_ME_EMAIL_CONFIRM", 24 * 3600)
}

fn default_device_update() -> TokenClassConfig {
    TokenClassConfig::new("CHANGE_ME_DEVICE_UPDATE", 10 * 60)
}

fn default_qr_login() -> TokenClassConfig {
    TokenClassConfig::new("CHANGE_ME_QR_LOGIN", 60)
}

fn default_issuer() -> String {
    "storyhub".to_string()
}

fn default_algorithm() -> String {
    "HS256".to_string()
}

fn default_password_min() -> usize {
    8
}
