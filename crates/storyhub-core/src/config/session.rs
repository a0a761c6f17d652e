//! Session management configuration.

use serde::{Deserialize, Serialize};

/// Session lifetime, limits, and retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// TTL for cached session projections in seconds.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
    /// How long expired session rows are kept before cleanup, in hours.
    #[serde(default = "default_retention")]
    pub retention_hours: u64,
    /// Interval for the retention cleanup loop in minutes.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_minutes: u64,
    /// Concurrent session limits.
    #[serde(default)]
    pub limits: SessionLimitsConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: default_cache_ttl(),
            retention_hours: default_retention(),
            cleanup_interval_minutes: default_cleanup_interval(),
            limits: SessionLimitsConfig::default(),
        }
    }
}

/// Concurrent session limits configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionLimitsConfig {
    /// Maximum active sessions per user.
    #[serde(default = "default_max_per_user")]
    pub max_per_user: u32,
    /// What happens when a login would exceed `max_per_user`.
    #[serde(default)]
    pub overflow_strategy: OverflowStrategy,
}

impl Default for SessionLimitsConfig {
    fn default() -> Self {
        Self {
            max_per_user: default_max_per_user(),
            overflow_strategy: OverflowStrategy::default(),
        }
    }
}

/// Strategy applied when a user tries to exceed their session limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverflowStrategy {
    /// Allow the login and log a warning.
    #[default]
    Warn,
    /// Deny the new login attempt.
    Deny,
    /// Terminate the oldest existing session to make room.
    KickOldest,
}

impl std::fmt::Display for OverflowStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverflowStrategy::Warn => write!(f, "warn"),
            OverflowStrategy::Deny => write!(f, "deny"),
            OverflowStrategy::KickOldest => write!(f, "kick_oldest"),
        }
    }
}

fn default_cache_ttl() -> u64 {
    900
}

fn default_retention() -> u64 {
    24 * 7
}

fn default_cleanup_interval() -> u64 {
    15
}

fn default_max_per_user() -> u32 {
    5
}
