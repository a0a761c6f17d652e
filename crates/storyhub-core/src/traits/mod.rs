//! Collaborator traits defined in `storyhub-core` and implemented by other crates.

pub mod cache;
pub mod ip_reputation;
pub mod pubsub;

pub use cache::CacheProvider;
pub use ip_reputation::{IpReputation, IpVerdict};
pub use pubsub::PubSub;
