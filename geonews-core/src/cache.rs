//! Trending result cache
//!
//! Keys quantize the query (lat/lon to 2 decimals, radius to 1 decimal) so that
//! nearby requests share an entry. The cache is advisory: callers log and carry
//! on when any operation fails.
//!
//! Two backends: an in-process map (`MemoryCache`) and a shared Redis server
//! (`RedisCache`), picked by `cache.backend`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::config::{CacheBackend, CacheConfig};

/// Prefix shared by every trending cache key.
pub const TRENDING_KEY_PREFIX: &str = "trending:";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        CacheError::Unavailable(e.to_string())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CacheStats {
    pub status: String,
    pub backend: String,
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Key/value store for serialized results with per-entry TTL.
#[async_trait]
pub trait ResultCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError>;

    async fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Duration,
    ) -> Result<(), CacheError>;

    /// Remove every key starting with `prefix`. Returns how many were removed.
    async fn clear(&self, prefix: &str) -> Result<usize, CacheError>;

    async fn stats(&self) -> Result<CacheStats, CacheError>;

    async fn ping(&self) -> bool;

    fn name(&self) -> &str;
}

fn quantize(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    // + 0.0 folds -0.0 into 0.0 so both sides of zero share a key
    (value * factor).round() / factor + 0.0
}

/// Cache key for a trending query: `trending:` + md5 of the quantized parameters.
pub fn trending_cache_key(latitude: f64, longitude: f64, radius_km: f64, limit: u32) -> String {
    let raw = format!(
        "trending:{:.2}:{:.2}:{:.1}:{}",
        quantize(latitude, 2),
        quantize(longitude, 2),
        quantize(radius_km, 1),
        limit
    );
    format!("{}{:x}", TRENDING_KEY_PREFIX, md5::compute(raw.as_bytes()))
}

// ============================================================================
// MemoryCache
// ============================================================================

struct Entry {
    value: serde_json::Value,
    expires_at: Instant,
}

/// In-process TTL cache. Expired entries read as absent and are evicted lazily.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(Some(entry.value.clone()));
                }
                Some(_) => {}
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    return Ok(None);
                }
            }
        }

        // expired: evict unless someone refreshed it meanwhile
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| e.expires_at <= now) {
            entries.remove(key);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    async fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn clear(&self, prefix: &str) -> Result<usize, CacheError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok(before - entries.len())
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        let now = Instant::now();
        let entries = self
            .entries
            .read()
            .await
            .values()
            .filter(|e| e.expires_at > now)
            .count();

        Ok(CacheStats {
            status: "connected".to_string(),
            backend: self.name().to_string(),
            entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        })
    }

    async fn ping(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "memory"
    }
}

// ============================================================================
// RedisCache
// ============================================================================

/// Redis-backed cache. Values are stored as JSON strings with `SET .. EX`.
pub struct RedisCache {
    conn: MultiplexedConnection,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RedisCache {
    /// Open a connection and check it with `PING`.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;

        Ok(Self {
            conn,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = conn.keys(format!("{}*", prefix)).await?;
        Ok(keys)
    }
}

#[async_trait]
impl ResultCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key).await?;

        match raw {
            Some(raw) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(serde_json::from_str(&raw)?))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let raw = serde_json::to_string(&value)?;
        let mut conn = self.conn.clone();
        // EX 0 is rejected by the server
        let _: () = conn.set_ex(key, raw, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn clear(&self, prefix: &str) -> Result<usize, CacheError> {
        let keys = self.keys_with_prefix(prefix).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        let removed: usize = conn.del(keys).await?;
        Ok(removed)
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        let entries = self.keys_with_prefix(TRENDING_KEY_PREFIX).await?.len();

        Ok(CacheStats {
            status: "connected".to_string(),
            backend: self.name().to_string(),
            entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        })
    }

    async fn ping(&self) -> bool {
        let mut conn = self.conn.clone();
        let pong: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        pong.is_ok()
    }

    fn name(&self) -> &str {
        "redis"
    }
}

/// Build the configured cache. `Ok(None)` when caching is disabled.
pub async fn create_cache(config: &CacheConfig) -> Result<Option<Arc<dyn ResultCache>>, CacheError> {
    if !config.enabled {
        return Ok(None);
    }

    let cache: Arc<dyn ResultCache> = match config.backend {
        CacheBackend::Memory => Arc::new(MemoryCache::new()),
        CacheBackend::Redis => Arc::new(RedisCache::connect(&config.url).await?),
    };
    tracing::info!(backend = cache.name(), "Trending cache ready");
    Ok(Some(cache))
}
