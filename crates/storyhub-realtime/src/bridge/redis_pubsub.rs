//! Redis pub/sub for multi-node deployments.

#[cfg(feature = "redis-pubsub")]
pub mod implementation {
    use async_trait::async_trait;
    use redis::aio::ConnectionManager;
    use tracing::{debug, info};

    use storyhub_core::error::{AppError, ErrorKind};
    use storyhub_core::result::AppResult;
    use storyhub_core::traits::PubSub;

    /// Redis publisher sharing one managed connection.
    #[derive(Clone)]
    pub struct RedisPubSub {
        conn: ConnectionManager,
    }

    impl std::fmt::Debug for RedisPubSub {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("RedisPubSub").finish_non_exhaustive()
        }
    }

    impl RedisPubSub {
        /// Connect to Redis.
        pub async fn connect(url: &str) -> AppResult<Self> {
            let client = redis::Client::open(url).map_err(|e| {
                AppError::with_source(ErrorKind::PubSub, "Invalid Redis URL", e)
            })?;
            let conn = ConnectionManager::new(client).await.map_err(|e| {
                AppError::with_source(ErrorKind::PubSub, "Redis connection failed", e)
            })?;
            info!("Connected Redis pub/sub");
            Ok(Self { conn })
        }
    }

    #[async_trait]
    impl PubSub for RedisPubSub {
        async fn publish(&self, channel: &str, payload: &str) -> AppResult<()> {
            let mut conn = self.conn.clone();
            let receivers: i64 = redis::cmd("PUBLISH")
                .arg(channel)
                .arg(payload)
                .query_async(&mut conn)
                .await
                .map_err(|e| AppError::with_source(ErrorKind::PubSub, "Redis PUBLISH failed", e))?;
            debug!(channel = %channel, receivers, "Published");
            Ok(())
        }
    }
}

#[cfg(not(feature = "redis-pubsub"))]
pub mod implementation {
    use storyhub_core::error::AppError;
    use storyhub_core::result::AppResult;

    /// Placeholder used when the `redis-pubsub` feature is disabled.
    #[derive(Debug, Clone)]
    pub struct RedisPubSub;

    impl RedisPubSub {
        /// Always fails: the crate was built without Redis support.
        pub async fn connect(_url: &str) -> AppResult<Self> {
            Err(AppError::configuration(
                "Redis pub/sub requires the `redis-pubsub` feature",
            ))
        }
    }

    #[async_trait::async_trait]
    impl storyhub_core::traits::PubSub for RedisPubSub {
        async fn publish(&self, _channel: &str, _payload: &str) -> AppResult<()> {
            Err(AppError::pubsub("Redis pub/sub is not available"))
        }
    }
}

pub use implementation::RedisPubSub;
