//! Publish/subscribe configuration for the QR pairing channel.

use serde::{Deserialize, Serialize};

/// Publish/subscribe backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Backend: `"memory"` (single node) or `"redis"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Redis URL used when `provider = "redis"`.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Buffered messages per in-memory channel.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            redis_url: default_redis_url(),
            channel_buffer: default_channel_buffer(),
        }
    }
}

fn default_provider() -> String {
    "memory".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_channel_buffer() -> usize {
    64
}
