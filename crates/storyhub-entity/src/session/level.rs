//! Session security level.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Security level assigned to a session after validation.
///
/// Ordered from least to most severe. `Critical` sessions are always
/// already terminated.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "security_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    /// No concerns.
    #[default]
    Low,
    /// Minor anomalies.
    Medium,
    /// Significant anomalies.
    High,
    /// Compromised.
    Critical,
}

impl SecurityLevel {
    /// Map a risk score (0..=100) to a level.
    pub fn from_risk_score(score: u32) -> Self {
        match score {
            0..=24 => Self::Low,
            25..=49 => Self::Medium,
            50..=79 => Self::High,
            _ => Self::Critical,
        }
    }

    /// Return the level as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
