//! Publish/subscribe backends.

pub mod memory_pubsub;
pub mod redis_pubsub;

use std::sync::Arc;

use tracing::info;

use storyhub_core::config::RealtimeConfig;
use storyhub_core::error::AppError;
use storyhub_core::result::AppResult;
use storyhub_core::traits::PubSub;

pub use memory_pubsub::MemoryPubSub;
pub use redis_pubsub::RedisPubSub;

/// Build the configured publish/subscribe backend.
pub async fn connect(config: &RealtimeConfig) -> AppResult<Arc<dyn PubSub>> {
    match config.provider.as_str() {
        "memory" => {
            info!(buffer = config.channel_buffer, "Initializing in-memory pub/sub");
            Ok(Arc::new(MemoryPubSub::new(config.channel_buffer)))
        }
        "redis" => {
            info!("Initializing Redis pub/sub");
            Ok(Arc::new(RedisPubSub::connect(&config.redis_url).await?))
        }
        other => Err(AppError::configuration(format!(
            "Unknown realtime provider: '{other}'. Supported: memory, redis"
        ))),
    }
}
