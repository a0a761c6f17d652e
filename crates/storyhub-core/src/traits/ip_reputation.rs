//! IP reputation lookup used by session security validation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::result::AppResult;

/// Verdict returned by a reputation source for one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IpVerdict {
    /// Nothing known against the address.
    Clean,
    /// Flagged, but not conclusively hostile.
    Suspicious,
    /// Known hostile.
    Malicious,
}

/// A source of IP reputation.
///
/// Unknown addresses and unconfigured sources report [`IpVerdict::Clean`].
#[async_trait]
pub trait IpReputation: Send + Sync + std::fmt::Debug + 'static {
    /// Look up the verdict for `ip`.
    async fn check(&self, ip: &str) -> AppResult<IpVerdict>;
}
