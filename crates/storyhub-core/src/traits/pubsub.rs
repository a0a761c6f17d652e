//! Publish side of the publish/subscribe service.

use async_trait::async_trait;

use crate::result::AppResult;

/// Fire-and-forget publisher of JSON documents to named channels.
///
/// Subscription is backend-specific and lives on the concrete types.
#[async_trait]
pub trait PubSub: Send + Sync + std::fmt::Debug + 'static {
    /// Publish `payload` to `channel`. Publishing to a channel without
    /// subscribers succeeds.
    async fn publish(&self, channel: &str, payload: &str) -> AppResult<()>;
}
