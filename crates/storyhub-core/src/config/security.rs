//! Session security policy.

use serde::{Deserialize, Serialize};

/// Thresholds used when scoring a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Sessions older than this are a high-severity violation.
    #[serde(default = "default_max_session_age")]
    pub max_session_age_hours: u64,
    /// More active sessions than this for one user produces a warning.
    #[serde(default = "default_concurrent_warning")]
    pub concurrent_session_warning: u32,
    /// Window in which a second fingerprint from the same IP is flagged.
    #[serde(default = "default_fingerprint_window")]
    pub fingerprint_window_minutes: u64,
    /// IPs reported as malicious by the static reputation source.
    #[serde(default)]
    pub blocked_ips: Vec<String>,
    /// IPs reported as suspicious by the static reputation source.
    #[serde(default)]
    pub suspicious_ips: Vec<String>,
    /// Terminate every session of a user when a spent refresh token is replayed.
    #[serde(default = "default_true")]
    pub revoke_all_on_refresh_reuse: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_session_age_hours: default_max_session_age(),
            concurrent_session_warning: default_concurrent_warning(),
            fingerprint_window_minutes: default_fingerprint_window(),
            blocked_ips: Vec::new(),
            suspicious_ips: Vec::new(),
            revoke_all_on_refresh_reuse: default_true(),
        }
    }
}

fn default_max_session_age() -> u64 {
    24 * 30
}

fn default_concurrent_warning() -> u32 {
    5
}

fn default_fingerprint_window() -> u64 {
    60
}

fn default_true() -> bool {
    true
}
