//! # stratacache-core
//!
//! Abstraction layer for the stratacache multi-tier caching engine.
//!
//! This crate defines the types and traits shared by the cache tiers and
//! the orchestrating engine. It contains no I/O implementations — those
//! live in the `stratacache` crate.
//!
//! ## Overview
//!
//! - [`CacheEntry`] — one stored value plus expiry/eviction metadata
//! - [`CacheConfig`] — per-namespace policy (TTL, capacity, tiers, refresh)
//! - [`CacheStats`] / [`StatsSnapshot`] — per-tier monotonic counters
//! - [`RemoteStore`] — the contract a distributed backend implements
//! - [`CacheLoader`] — a data source for cache warming
//! - [`CacheError`] — the subsystem's error taxonomy
//!
//! ## Example
//!
//! ```ignore
//! use stratacache_core::{CacheConfig, CachePolicy, TierKind};
//!
//! let config = CacheConfig::new()
//!     .with_ttl_seconds(300)
//!     .with_policy(CachePolicy::RefreshAhead)
//!     .with_auto_refresh(true)
//!     .with_tiers(vec![TierKind::InProcess, TierKind::Distributed]);
//! config.validate()?;
//! ```

mod config;
mod entry;
mod error;
mod stats;
mod store;

pub use config::{
    CacheConfig, CachePolicy, DEFAULT_NAMESPACE, TierKind, full_key, namespace_prefix,
};
pub use entry::CacheEntry;
pub use error::{CacheError, ErrorCategory};
pub use stats::{CacheStats, StatsSnapshot};
pub use store::{CacheLoader, CacheResult, DynCacheLoader, DynRemoteStore, RemoteStore};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use stratacache_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{
        CacheConfig, CachePolicy, DEFAULT_NAMESPACE, TierKind, full_key, namespace_prefix,
    };
    pub use crate::entry::CacheEntry;
    pub use crate::error::{CacheError, ErrorCategory};
    pub use crate::stats::{CacheStats, StatsSnapshot};
    pub use crate::store::{CacheLoader, CacheResult, DynCacheLoader, DynRemoteStore, RemoteStore};
}
