//! IP reputation sources.

use std::collections::HashSet;

use async_trait::async_trait;

use storyhub_core::config::SecurityConfig;
use storyhub_core::result::AppResult;
use storyhub_core::traits::{IpReputation, IpVerdict};

/// Reputation source that knows nothing and reports every address clean.
#[derive(Debug, Clone, Default)]
pub struct NoopIpReputation;

#[async_trait]
impl IpReputation for NoopIpReputation {
    async fn check(&self, _ip: &str) -> AppResult<IpVerdict> {
        Ok(IpVerdict::Clean)
    }
}

/// Reputation source backed by configured address lists.
#[derive(Debug, Clone, Default)]
pub struct StaticIpReputation {
    blocked: HashSet<String>,
    suspicious: HashSet<String>,
}

impl StaticIpReputation {
    /// Build from `security.blocked_ips` and `security.suspicious_ips`.
    pub fn from_config(config: &SecurityConfig) -> Self {
        let normalize = |ips: &[String]| ips.iter().map(|ip| ip.trim().to_string()).collect();
        Self {
            blocked: normalize(&config.blocked_ips),
            suspicious: normalize(&config.suspicious_ips),
        }
    }

    /// Whether any address is configured.
    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty() && self.suspicious.is_empty()
    }
}

#[async_trait]
impl IpReputation for StaticIpReputation {
    async fn check(&self, ip: &str) -> AppResult<IpVerdict> {
        let ip = ip.trim();
        if self.blocked.contains(ip) {
            Ok(IpVerdict::Malicious)
        } else if self.suspicious.contains(ip) {
            Ok(IpVerdict::Suspicious)
        } else {
            Ok(IpVerdict::Clean)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_lists() {
        let config = SecurityConfig {
            blocked_ips: vec!["203.0.113.9".to_string()],
            suspicious_ips: vec![" 198.51.100.7 ".to_string()],
            ..SecurityConfig::default()
        };
        let source = StaticIpReputation::from_config(&config);
        assert_eq!(source.check("203.0.113.9").await.unwrap(), IpVerdict::Malicious);
        assert_eq!(source.check("198.51.100.7").await.unwrap(), IpVerdict::Suspicious);
        assert_eq!(source.check("192.0.2.1").await.unwrap(), IpVerdict::Clean);
    }

    #[tokio::test]
    async fn test_noop_is_clean() {
        assert_eq!(
            NoopIpReputation.check("203.0.113.9").await.unwrap(),
            IpVerdict::Clean
        );
    }
}
