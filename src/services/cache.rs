//! Per-user task list cache.
//!
//! The cache is never the system of record. Entries are keyed by owner
//! (`tasks:{userId}`), hold a serialized snapshot of the owner's task list and
//! expire after a TTL. Callers treat every cache error as a miss.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{sync::RwLock, time::Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{CacheBackend, CacheConfig};
use crate::errors::AppResult;
use crate::models::Task;

const MAX_BACKOFF: Duration = Duration::from_millis(3000);
const BACKOFF_STEP: Duration = Duration::from_millis(100);

pub fn cache_key(user_id: Uuid) -> String {
    format!("tasks:{}", user_id)
}

#[async_trait]
pub trait TaskCache: Send + Sync {
    async fn get(&self, user_id: Uuid) -> AppResult<Option<Vec<Task>>>;
    async fn put(&self, user_id: Uuid, tasks: &[Task], ttl: Duration) -> AppResult<()>;
    async fn invalidate(&self, user_id: Uuid) -> AppResult<()>;
    fn name(&self) -> &'static str;
}

/// Redis cache using `SET .. EX` for expiry.
#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
}

impl RedisCache {
    pub fn new(manager: ConnectionManager) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl TaskCache for RedisCache {
    async fn get(&self, user_id: Uuid) -> AppResult<Option<Vec<Task>>> {
        let mut conn = self.manager.clone();
        let cached: Option<String> = conn.get(cache_key(user_id)).await?;
        Ok(match cached {
            Some(data) => Some(serde_json::from_str(&data)?),
            None => None,
        })
    }

    async fn put(&self, user_id: Uuid, tasks: &[Task], ttl: Duration) -> AppResult<()> {
        let mut conn = self.manager.clone();
        redis::cmd("SET")
            .arg(cache_key(user_id))
            .arg(serde_json::to_string(tasks)?)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn invalidate(&self, user_id: Uuid) -> AppResult<()> {
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(cache_key(user_id)).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

/// In-process TTL cache holding serialized snapshots.
#[derive(Default, Clone)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<Uuid, (Instant, String)>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskCache for MemoryCache {
    async fn get(&self, user_id: Uuid) -> AppResult<Option<Vec<Task>>> {
        let entries = self.entries.read().await;
        match entries.get(&user_id) {
            Some((expires_at, data)) if *expires_at > Instant::now() => {
                Ok(Some(serde_json::from_str(data)?))
            }
            _ => Ok(None),
        }
    }

    async fn put(&self, user_id: Uuid, tasks: &[Task], ttl: Duration) -> AppResult<()> {
        let data = serde_json::to_string(tasks)?;
        let mut entries = self.entries.write().await;
        entries.retain(|_, (expires_at, _)| *expires_at > Instant::now());
        entries.insert(user_id, (Instant::now() + ttl, data));
        Ok(())
    }

    async fn invalidate(&self, user_id: Uuid) -> AppResult<()> {
        self.entries.write().await.remove(&user_id);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Pass-through mode: every read misses and every write is dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

#[async_trait]
impl TaskCache for NoopCache {
    async fn get(&self, _user_id: Uuid) -> AppResult<Option<Vec<Task>>> {
        Ok(None)
    }

    async fn put(&self, _user_id: Uuid, _tasks: &[Task], _ttl: Duration) -> AppResult<()> {
        Ok(())
    }

    async fn invalidate(&self, _user_id: Uuid) -> AppResult<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Delay before the next connection attempt, `attempt` starting at 1.
pub fn backoff_delay(attempt: u32) -> Duration {
    BACKOFF_STEP.saturating_mul(attempt).min(MAX_BACKOFF)
}

/// Connects to the Redis cache, retrying with bounded backoff. Returns `None`
/// once the retry ceiling is reached.
pub async fn connect_redis_cache(url: &str, config: &CacheConfig) -> Option<RedisCache> {
    let client = match Client::open(url) {
        Ok(client) => client,
        Err(e) => {
            warn!("Invalid cache URL, running without cache: {}", e);
            return None;
        }
    };

    let mut attempt = 0;
    loop {
        match tokio::time::timeout(config.connect_timeout(), ConnectionManager::new(client.clone()))
            .await
        {
            Ok(Ok(manager)) => {
                info!("Redis cache connected");
                return Some(RedisCache::new(manager));
            }
            Ok(Err(e)) => warn!("Redis cache connection failed: {}", e),
            Err(_) => warn!(
                "Redis cache connection timed out after {:?}",
                config.connect_timeout()
            ),
        }

        attempt += 1;
        if attempt > config.max_retries {
            error!("Redis cache connection failed after {} retries", config.max_retries);
            return None;
        }
        tokio::time::sleep(backoff_delay(attempt)).await;
    }
}

/// Picks the cache implementation at startup. An unreachable or
/// unconfigured backend yields the no-op cache rather than an error.
pub async fn select_cache(config: &CacheConfig) -> Arc<dyn TaskCache> {
    match config.backend {
        CacheBackend::Disabled => {
            info!("Task cache disabled");
            Arc::new(NoopCache)
        }
        CacheBackend::Memory => Arc::new(MemoryCache::new()),
        CacheBackend::Redis => {
            let Some(url) = config.url.as_deref() else {
                warn!("Cache URL not configured, running without cache");
                return Arc::new(NoopCache);
            };
            match connect_redis_cache(url, config).await {
                Some(cache) => Arc::new(cache),
                None => {
                    warn!("Redis not available, running without cache");
                    Arc::new(NoopCache)
                }
            }
        }
    }
}
