//! Response cache consulted before the orchestrator.
//!
//! Values are serialized `RecommendationResponse` JSON keyed by
//! `recs:{user_id}:{top_k}` and expire after a fixed TTL (one hour by default).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use moka::future::Cache;
use tracing::{debug, info};

/// Default time-to-live for cached responses
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Cache key for one (user, top_k) pair
pub fn cache_key(user_id: &str, top_k: usize) -> String {
    format!("recs:{}:{}", user_id, top_k)
}

/// Key/value store with TTL holding serialized responses.
///
/// Errors are reported, never fatal: the service treats a failed read as a
/// miss and a failed write as a no-op.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    fn name(&self) -> &str;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn put(&self, key: &str, value: String) -> Result<()>;

    async fn health_check(&self) -> Result<()>;
}

/// Hit/miss counters for a cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: u64,
}

/// Local in-memory cache backed by Moka
pub struct MokaResponseCache {
    cache: Cache<String, String>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MokaResponseCache {
    pub fn new(ttl: Duration, max_entries: u64) -> Self {
        info!(
            "Initializing response cache (ttl {:?}, max {} entries)",
            ttl, max_entries
        );
        Self {
            cache: Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(ttl)
                .build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.entry_count(),
        }
    }
}

impl Default for MokaResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, 10_000)
    }
}

#[async_trait]
impl ResponseCache for MokaResponseCache {
    fn name(&self) -> &str {
        "cache"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self.cache.get(key).await;
        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Cache hit for {}", key);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        Ok(value)
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        self.cache.insert(key.to_string(), value).await;
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Cache that never stores anything (caching disabled)
#[derive(Debug, Default)]
pub struct NoCache;

#[async_trait]
impl ResponseCache for NoCache {
    fn name(&self) -> &str {
        "cache"
    }

    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn put(&self, _key: &str, _value: String) -> Result<()> {
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_format() {
        assert_eq!(cache_key("user_1", 5), "recs:user_1:5");
    }

    #[tokio::test]
    async fn test_moka_round_trip_and_stats() {
        let cache = MokaResponseCache::new(Duration::from_secs(60), 100);

        assert_eq!(cache.get("recs:a:5").await.unwrap(), None);
        cache.put("recs:a:5", "[]".to_string()).await.unwrap();
        assert_eq!(cache.get("recs:a:5").await.unwrap(), Some("[]".to_string()));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = MokaResponseCache::new(Duration::from_millis(50), 100);
        cache.put("k", "v".to_string()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_no_cache_never_hits() {
        let cache = NoCache;
        cache.put("k", "v".to_string()).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }
}
