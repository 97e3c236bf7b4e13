//! Memoization over the cache engine.
//!
//! `Memoizer` wraps a computation so repeated calls with the same key reuse
//! the engine instead of recomputing. It is a plain higher-order wrapper —
//! build one with a namespace and optional TTL, then hand it closures. For
//! callers without a natural string key, [`Memoizer::key_for_args`] derives
//! one by hashing the arguments.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use stratacache_core::{CacheResult, DEFAULT_NAMESPACE};

use crate::engine::CacheEngine;

/// Caches the results of a computation under a fixed namespace.
#[derive(Clone)]
pub struct Memoizer {
    engine: Arc<CacheEngine>,
    namespace: String,
    ttl: Option<u64>,
}

impl Memoizer {
    /// Creates a memoizer over the `"default"` namespace with the
    /// namespace's default TTL.
    #[must_use]
    pub fn new(engine: Arc<CacheEngine>) -> Self {
        Self {
            engine,
            namespace: DEFAULT_NAMESPACE.to_string(),
            ttl: None,
        }
    }

    /// Sets the namespace results are cached under.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Overrides the namespace's default TTL for stored results.
    #[must_use]
    pub fn with_ttl_seconds(mut self, ttl_seconds: u64) -> Self {
        self.ttl = Some(ttl_seconds);
        self
    }

    /// Derives a cache key from arbitrary hashable arguments.
    #[must_use]
    pub fn key_for_args<A: Hash>(args: &A) -> String {
        let mut hasher = DefaultHasher::new();
        args.hash(&mut hasher);
        format!("memo:{:x}", hasher.finish())
    }

    /// Returns the cached result for `key`, or awaits `f`, stores its
    /// result, and returns it.
    ///
    /// A cached value that no longer decodes as `T` is treated as a miss
    /// and recomputed. `f` is invoked only on a miss.
    pub async fn get_or_compute<T, F, Fut>(&self, key: &str, f: F) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if let Some(value) = self.lookup::<T>(key).await {
            return value;
        }

        let result = f().await;
        self.store(key, &result).await;
        result
    }

    /// Fallible variant of [`get_or_compute`](Self::get_or_compute): a
    /// failed computation stores nothing and the error is returned to the
    /// caller untouched.
    ///
    /// # Errors
    ///
    /// Returns whatever error `f` produced.
    pub async fn get_or_try_compute<T, F, Fut>(&self, key: &str, f: F) -> CacheResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = CacheResult<T>>,
    {
        if let Some(value) = self.lookup::<T>(key).await {
            return Ok(value);
        }

        let result = f().await?;
        self.store(key, &result).await;
        Ok(result)
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.engine.get(&self.namespace, key).await?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(
                    namespace = %self.namespace,
                    key = %key,
                    error = %e,
                    "Cached value undecodable, recomputing"
                );
                None
            }
        }
    }

    async fn store<T: Serialize>(&self, key: &str, result: &T) {
        match serde_json::to_value(result) {
            Ok(value) => {
                self.engine
                    .set(&self.namespace, key, value, self.ttl)
                    .await;
            }
            Err(e) => {
                warn!(
                    namespace = %self.namespace,
                    key = %key,
                    error = %e,
                    "Result not serializable, skipping cache store"
                );
            }
        }
    }
}
