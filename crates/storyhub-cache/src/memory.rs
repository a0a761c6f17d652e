//! In-memory cache implementation using the moka crate.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use moka::Expiry;
use moka::future::Cache;

use storyhub_core::config::cache::MemoryCacheConfig;
use storyhub_core::result::AppResult;
use storyhub_core::traits::CacheProvider;

/// A cached string together with the TTL it was written with.
#[derive(Debug, Clone)]
struct Entry {
    value: String,
    ttl: Duration,
}

/// Expires each entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// A counter with its own deadline.
#[derive(Debug, Clone, Copy)]
struct Counter {
    value: i64,
    expires_at: Instant,
}

/// In-memory cache provider using moka.
///
/// Counters live in a separate map so `incr` is atomic per key.
#[derive(Debug, Clone)]
pub struct MemoryCacheProvider {
    cache: Cache<String, Entry>,
    default_ttl: Duration,
    counters: Arc<DashMap<String, Counter>>,
}

impl MemoryCacheProvider {
    /// Create a new in-memory cache from configuration.
    pub fn new(config: &MemoryCacheConfig, default_ttl_seconds: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(PerEntryTtl)
            .build();

        Self {
            cache,
            default_ttl: Duration::from_secs(default_ttl_seconds),
            counters: Arc::new(DashMap::new()),
        }
    }

    fn live_counter(&self, key: &str) -> Option<i64> {
        let counter = *self.counters.get(key)?;
        if counter.expires_at <= Instant::now() {
            self.counters
                .remove_if(key, |_, c| c.expires_at <= Instant::now());
            return None;
        }
        Some(counter.value)
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        if let Some(value) = self.live_counter(key) {
            return Ok(Some(value.to_string()));
        }
        Ok(self.cache.get(key).await.map(|entry| entry.value))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.counters.remove(key);
        self.cache
            .insert(
                key.to_string(),
                Entry {
                    value: value.to_string(),
                    ttl,
                },
            )
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.cache.remove(key).await;
        self.counters.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.live_counter(key).is_some() || self.cache.get(key).await.is_some())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        let entry = self
            .cache
            .entry(key.to_string())
            .or_insert(Entry {
                value: value.to_string(),
                ttl,
            })
            .await;
        Ok(entry.is_fresh())
    }

    async fn incr(&self, key: &str) -> AppResult<i64> {
        let now = Instant::now();
        let mut counter = self.counters.entry(key.to_string()).or_insert(Counter {
            value: 0,
            expires_at: now + self.default_ttl,
        });
        if counter.expires_at <= now {
            counter.value = 0;
            counter.expires_at = now + self.default_ttl;
        }
        counter.value += 1;
        Ok(counter.value)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        if self.live_counter(key).is_some() {
            if let Some(mut counter) = self.counters.get_mut(key) {
                counter.expires_at = Instant::now() + ttl;
                return Ok(true);
            }
        }
        match self.cache.get(key).await {
            Some(entry) => {
                self.cache
                    .insert(
                        key.to_string(),
                        Entry {
                            value: entry.value,
                            ttl,
                        },
                    )
                    .await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
