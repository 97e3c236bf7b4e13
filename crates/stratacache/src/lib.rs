//! # stratacache
//!
//! Multi-tier caching engine: a bounded, mutex-protected, LRU-evicting
//! in-process tier in front of an optional shared remote key-value store,
//! composed behind one read/write contract.
//!
//! ## Overview
//!
//! - [`CacheEngine`] — the orchestrator callers interact with: reads walk
//!   tiers near-to-far and promote on hit, writes fan out to all configured
//!   tiers, tag invalidation / namespace clearing / warming / refresh-ahead
//!   scheduling are coordinated here.
//! - [`MemoryTier`] / [`DistributedTier`] — the two tiers. Tier-level
//!   failures never reach callers; a down remote store degrades the system
//!   to in-process-only caching, not an outage.
//! - [`Memoizer`] — wraps computations so repeated calls reuse the engine.
//! - `RedisStore` (feature `redis-cache`) — Redis backend for the
//!   distributed tier.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use serde_json::json;
//! use stratacache::{CacheEngine, prelude::*};
//!
//! let engine = Arc::new(CacheEngine::new());
//! engine.initialize().await;
//! engine.configure("users", CacheConfig::new().with_ttl_seconds(300))?;
//!
//! engine.set("users", "42", json!({"name": "amy"}), None).await;
//! let user = engine.get("users", "42").await;
//!
//! engine.shutdown();
//! ```

pub mod engine;
pub mod memoize;
pub mod tasks;
pub mod tier;

#[cfg(feature = "redis-cache")]
pub mod redis;

#[cfg(test)]
mod testing;

pub use engine::{CacheEngine, EngineStats};
pub use memoize::Memoizer;
pub use tasks::TaskRegistry;
pub use tier::{DistributedTier, MemoryTier};

#[cfg(feature = "redis-cache")]
pub use redis::RedisStore;

// Re-export the abstraction layer so callers need only one dependency.
pub use stratacache_core::{
    CacheConfig, CacheEntry, CacheError, CacheLoader, CachePolicy, CacheResult, CacheStats,
    DEFAULT_NAMESPACE, DynCacheLoader, DynRemoteStore, ErrorCategory, RemoteStore, StatsSnapshot,
    TierKind, full_key, namespace_prefix,
};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use stratacache::prelude::*;
/// ```
pub mod prelude {
    pub use crate::engine::{CacheEngine, EngineStats};
    pub use crate::memoize::Memoizer;
    pub use crate::tier::{DistributedTier, MemoryTier};
    #[cfg(feature = "redis-cache")]
    pub use crate::redis::RedisStore;
    pub use stratacache_core::prelude::*;
}
