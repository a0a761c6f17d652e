//! Session risk scoring.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use storyhub_core::config::SecurityConfig;
use storyhub_core::traits::{IpReputation, IpVerdict};
use storyhub_entity::session::{SecurityLevel, Session};

/// Risk score at or above which a session is compromised.
const COMPROMISE_THRESHOLD: u32 = 80;

/// Score contributed by each warning.
const WARNING_WEIGHT: u32 = 2;

/// Severity of a single violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational.
    Low,
    /// Worth attention.
    Medium,
    /// Likely abuse.
    High,
    /// Terminate the session.
    Critical,
}

impl Severity {
    /// Contribution of one violation of this severity to the risk score.
    pub fn weight(&self) -> u32 {
        match self {
            Self::Low => 5,
            Self::Medium => 15,
            Self::High => 25,
            Self::Critical => 40,
        }
    }
}

/// What a violation is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// The session outlived the maximum age.
    SessionAge,
    /// The session's IP has a bad reputation.
    IpReputation,
    /// Another device fingerprint is active from the same IP.
    FingerprintConflict,
}

/// A single failed check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Check that failed.
    pub kind: ViolationKind,
    /// How bad it is.
    pub severity: Severity,
    /// Human-readable detail for logs.
    pub detail: String,
}

/// Outcome of validating one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityReport {
    /// No violations were found. Warnings do not affect validity.
    pub is_valid: bool,
    /// Failed checks.
    pub violations: Vec<Violation>,
    /// Observations that raise the score without invalidating the session.
    pub warnings: Vec<String>,
    /// 0 to 100.
    pub risk_score: u32,
}

impl SecurityReport {
    /// Build a report and compute its score.
    pub fn from_findings(violations: Vec<Violation>, warnings: Vec<String>) -> Self {
        let violation_score: u32 = violations.iter().map(|v| v.severity.weight()).sum();
        let warning_score = WARNING_WEIGHT.saturating_mul(warnings.len() as u32);
        Self {
            is_valid: violations.is_empty(),
            risk_score: violation_score.saturating_add(warning_score).min(100),
            violations,
            warnings,
        }
    }

    /// Level the session should carry after this report.
    pub fn level(&self) -> SecurityLevel {
        if self.has_critical() {
            SecurityLevel::Critical
        } else {
            SecurityLevel::from_risk_score(self.risk_score)
        }
    }

    /// Whether the session must be force-expired.
    pub fn requires_compromise(&self) -> bool {
        self.risk_score >= COMPROMISE_THRESHOLD || self.has_critical()
    }

    fn has_critical(&self) -> bool {
        self.violations
            .iter()
            .any(|v| v.severity == Severity::Critical)
    }
}

/// Scores a session against its owner's other sessions and its IP.
#[derive(Clone)]
pub struct SecurityValidator {
    ip_reputation: Arc<dyn IpReputation>,
    config: SecurityConfig,
}

impl std::fmt::Debug for SecurityValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityValidator")
            .field("config", &self.config)
            .finish()
    }
}

impl SecurityValidator {
    /// Create a validator with the given reputation source.
    pub fn new(ip_reputation: Arc<dyn IpReputation>, config: SecurityConfig) -> Self {
        Self {
            ip_reputation,
            config,
        }
    }

    /// Validate `session`. `active_sessions` are the owner's active
    /// sessions and may include `session` itself.
    ///
    /// A failed reputation lookup counts as clean.
    pub async fn validate(
        &self,
        session: &Session,
        active_sessions: &[Session],
        now: DateTime<Utc>,
    ) -> SecurityReport {
        let verdict = match self.ip_reputation.check(&session.ip_address).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(
                    session_id = %session.id,
                    error = %e,
                    "IP reputation lookup failed, treating address as clean"
                );
                IpVerdict::Clean
            }
        };
        self.evaluate(session, active_sessions, verdict, now)
    }

    /// Score a session given an already-resolved IP verdict.
    pub fn evaluate(
        &self,
        session: &Session,
        active_sessions: &[Session],
        verdict: IpVerdict,
        now: DateTime<Utc>,
    ) -> SecurityReport {
        let mut violations = Vec::new();
        let mut warnings = Vec::new();

        let max_age = Duration::hours(self.config.max_session_age_hours as i64);
        let age = session.age_at(now);
        if age > max_age {
            violations.push(Violation {
                kind: ViolationKind::SessionAge,
                severity: Severity::High,
                detail: format!(
                    "session is {}h old, maximum is {}h",
                    age.num_hours(),
                    self.config.max_session_age_hours
                ),
            });
        }

        let ip_severity = match verdict {
            IpVerdict::Clean => None,
            IpVerdict::Suspicious => Some(Severity::Medium),
            IpVerdict::Malicious => Some(Severity::Critical),
        };
        if let Some(severity) = ip_severity {
            violations.push(Violation {
                kind: ViolationKind::IpReputation,
                severity,
                detail: format!("address {} has a bad reputation", session.ip_address),
            });
        }

        let active = active_sessions
            .iter()
            .filter(|s| s.user_id == session.user_id && s.is_active && !s.is_expired_at(now))
            .count();
        if active > self.config.concurrent_session_warning as usize {
            warnings.push(format!(
                "{active} active sessions, warning threshold is {}",
                self.config.concurrent_session_warning
            ));
        }

        let window = Duration::minutes(self.config.fingerprint_window_minutes as i64);
        let conflicting = active_sessions.iter().any(|other| {
            other.id != session.id
                && other.user_id == session.user_id
                && other.is_active
                && other.ip_address == session.ip_address
                && other.fingerprint != session.fingerprint
                && now - other.last_activity_at <= window
        });
        if conflicting {
            violations.push(Violation {
                kind: ViolationKind::FingerprintConflict,
                severity: Severity::Medium,
                detail: format!(
                    "another device fingerprint is active from {}",
                    session.ip_address
                ),
            });
        }

        SecurityReport::from_findings(violations, warnings)
    }
}
