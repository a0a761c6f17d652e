//! One-time passcode policy.
//!
//! Digits and window are process-wide so callers cannot request a weaker
//! code.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// OTP generation and verification policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpConfig {
    /// Server-side secret from which per-subject keys are derived.
    #[serde(default = "default_secret")]
    pub secret: String,
    /// Number of digits in a code.
    #[serde(default = "default_digits")]
    pub digits: u32,
    /// Time step in seconds.
    #[serde(default = "default_window")]
    pub window_seconds: u64,
    /// Previous time steps still accepted (clock drift / delivery delay).
    #[serde(default = "default_skew")]
    pub skew_steps: u64,
    /// Failed confirmations allowed per subject inside `attempt_window_seconds`.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Window for counting failed confirmations.
    #[serde(default = "default_attempt_window")]
    pub attempt_window_seconds: u64,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            secret: default_secret(),
            digits: default_digits(),
            window_seconds: default_window(),
            skew_steps: default_skew(),
            max_attempts: default_max_attempts(),
            attempt_window_seconds: default_attempt_window(),
        }
    }
}

impl OtpConfig {
    /// Validate the policy values.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.secret.trim().is_empty() {
            return Err(AppError::configuration("otp.secret must not be empty"));
        }
        if !(4..=10).contains(&self.digits) {
            return Err(AppError::configuration(format!(
                "otp.digits must be between 4 and 10, got {}",
                self.digits
            )));
        }
        if self.window_seconds == 0 {
            return Err(AppError::configuration("otp.window_seconds must be positive"));
        }
        Ok(())
    }
}

fn default_secret() -> String {
    "CHANGE_ME_OTP".to_string()
}

fn default_digits() -> u32 {
    6
}

fn default_window() -> u64 {
    30
}

fn default_skew() -> u64 {
    1
}

fn default_max_attempts() -> u32 {
    5
}

fn default_attempt_window() -> u64 {
    900
}
