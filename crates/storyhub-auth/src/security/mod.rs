//! Session security validation and IP reputation sources.

pub mod ip_reputation;
pub mod validator;

pub use ip_reputation::{NoopIpReputation, StaticIpReputation};
pub use validator::{SecurityReport, SecurityValidator, Severity, Violation, ViolationKind};
