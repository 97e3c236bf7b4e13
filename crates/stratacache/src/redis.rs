//! Redis implementation of the remote store contract.
//!
//! Available behind the `redis-cache` feature. The store reports failures
//! honestly as `CacheError::Transport`; swallowing them is the distributed
//! tier's job, so this module stays a thin command adapter over a
//! connection pool.

use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, Runtime, redis::AsyncCommands};

use stratacache_core::{CacheError, CacheResult, RemoteStore};

/// How many keys one SCAN iteration asks Redis for during prefix deletion.
const SCAN_BATCH: u64 = 100;

/// Remote store backed by a Redis connection pool.
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    /// Creates a store over an existing pool.
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Creates a store from a connection URL (`redis://host:port/db`).
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Transport` if the pool cannot be created. The
    /// URL is not dialed here; connectivity is checked by `ping`.
    pub fn from_url(url: &str) -> CacheResult<Self> {
        let pool = Config::from_url(url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::transport(format!("failed to create Redis pool: {e}")))?;
        Ok(Self { pool })
    }

    async fn connection(&self) -> CacheResult<Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::transport(format!("Redis connection error: {e}")))
    }
}

#[async_trait]
impl RemoteStore for RedisStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;
        let bytes: Option<Vec<u8>> = conn
            .get(key)
            .await
            .map_err(|e| CacheError::transport(format!("Redis GET error: {e}")))?;
        Ok(bytes)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl_seconds: u64) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        let _: () = conn
            .set_ex(key, value, ttl_seconds)
            .await
            .map_err(|e| CacheError::transport(format!("Redis SETEX error: {e}")))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.connection().await?;
        let removed: u64 = conn
            .del(key)
            .await
            .map_err(|e| CacheError::transport(format!("Redis DEL error: {e}")))?;
        Ok(removed > 0)
    }

    async fn delete_prefix(&self, prefix: &str) -> CacheResult<u64> {
        let mut conn = self.connection().await?;
        let pattern = format!("{prefix}*");
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = deadpool_redis::redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|e| CacheError::transport(format!("Redis SCAN error: {e}")))?;

            if !keys.is_empty() {
                let count: u64 = conn
                    .del(keys)
                    .await
                    .map_err(|e| CacheError::transport(format!("Redis DEL error: {e}")))?;
                removed += count;
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        Ok(removed)
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        let _: String = deadpool_redis::redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::transport(format!("Redis PING error: {e}")))?;
        Ok(())
    }

    async fn flush(&self) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        let _: String = deadpool_redis::redis::cmd("FLUSHDB")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::transport(format!("Redis FLUSHDB error: {e}")))?;
        Ok(())
    }
}
