//! Time-windowed numeric codes bound to a subject.
//!
//! The per-subject key is HMAC-SHA256(server secret, normalized subject);
//! the code is a TOTP over that key. Nothing is stored on generation, so a
//! code can only be validated, never looked up.

use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha2::Sha256;

use storyhub_core::config::OtpConfig;

type HmacSha256 = Hmac<Sha256>;

/// Generates and verifies one-time passcodes.
///
/// Digits, window, and skew are fixed at construction from process
/// configuration; callers cannot weaken them.
#[derive(Clone)]
pub struct OtpCodec {
    secret: Vec<u8>,
    digits: u32,
    window_seconds: u64,
    skew_steps: u64,
}

impl std::fmt::Debug for OtpCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtpCodec")
            .field("digits", &self.digits)
            .field("window_seconds", &self.window_seconds)
            .field("skew_steps", &self.skew_steps)
            .finish_non_exhaustive()
    }
}

impl OtpCodec {
    /// Build a codec from the `otp` configuration section.
    pub fn new(config: &OtpConfig) -> Self {
        Self {
            secret: config.secret.as_bytes().to_vec(),
            digits: config.digits,
            window_seconds: config.window_seconds.max(1),
            skew_steps: config.skew_steps,
        }
    }

    /// Number of digits in generated codes.
    pub fn digits(&self) -> u32 {
        self.digits
    }

    /// Generate the current code for `subject`.
    ///
    /// Returns `None` when the subject is empty after normalization.
    pub fn generate(&self, subject: &str) -> Option<String> {
        self.generate_at(subject, unix_now()?)
    }

    /// Generate the code for `subject` at `unix_secs`.
    pub fn generate_at(&self, subject: &str, unix_secs: u64) -> Option<String> {
        let key = self.subject_key(subject)?;
        Some(totp_lite::totp_custom::<totp_lite::Sha256>(
            self.window_seconds,
            self.digits,
            &key,
            unix_secs,
        ))
    }

    /// Verify `code` for `subject` at the current time.
    ///
    /// Any internal failure is a verification failure.
    pub fn verify(&self, code: &str, subject: &str) -> bool {
        match unix_now() {
            Some(now) => self.verify_at(code, subject, now),
            None => false,
        }
    }

    /// Verify `code` for `subject` at `unix_secs`, accepting the current
    /// window and `skew_steps` previous ones.
    pub fn verify_at(&self, code: &str, subject: &str, unix_secs: u64) -> bool {
        let code = code.trim();
        if code.len() != self.digits as usize || !code.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        let Some(key) = self.subject_key(subject) else {
            return false;
        };

        let mut matched = false;
        for step in 0..=self.skew_steps {
            let Some(at) = unix_secs.checked_sub(step * self.window_seconds) else {
                break;
            };
            let expected = totp_lite::totp_custom::<totp_lite::Sha256>(
                self.window_seconds,
                self.digits,
                &key,
                at,
            );
            matched |= constant_time_eq(expected.as_bytes(), code.as_bytes());
        }
        matched
    }

    fn subject_key(&self, subject: &str) -> Option<Vec<u8>> {
        let normalized = subject.trim().to_lowercase();
        if normalized.is_empty() {
            return None;
        }
        let mut mac = HmacSha256::new_from_slice(&self.secret).ok()?;
        mac.update(normalized.as_bytes());
        Some(mac.finalize().into_bytes().to_vec())
    }
}

fn unix_now() -> Option<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs())
}

/// Compare without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
