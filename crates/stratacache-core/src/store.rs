//! Backend traits for the caching engine.
//!
//! `RemoteStore` is the contract a distributed key-value backend must
//! implement; the engine never talks to a concrete backend directly. The
//! tier wrapping a `RemoteStore` is responsible for catching its errors —
//! implementations should report failures honestly and let the tier decide
//! how to degrade.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::CacheError;

/// Type alias for a cache result.
pub type CacheResult<T> = Result<T, CacheError>;

/// A remote, shared key-value store used as the distributed tier's backend.
///
/// Implementations must be thread-safe (`Send + Sync`). Values are opaque
/// byte payloads; TTL enforcement on the remote side is advisory — the
/// distributed tier re-checks expiry from the metadata embedded in the
/// payload on every read.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetches the payload stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Transport` on network failure.
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Stores `value` under `key` with the given TTL.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Transport` on network failure.
    async fn set(&self, key: &str, value: Vec<u8>, ttl_seconds: u64) -> CacheResult<()>;

    /// Deletes `key`, returning `true` if it was present.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Transport` on network failure.
    async fn delete(&self, key: &str) -> CacheResult<bool>;

    /// Deletes every key starting with `prefix`, returning how many were
    /// removed. Used for namespace-wide invalidation.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Transport` on network failure.
    async fn delete_prefix(&self, prefix: &str) -> CacheResult<u64>;

    /// Checks connectivity.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Transport` if the store is unreachable.
    async fn ping(&self) -> CacheResult<()>;

    /// Removes every key in the store.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Transport` on network failure.
    async fn flush(&self) -> CacheResult<()>;
}

/// Type alias for a boxed remote store trait object.
pub type DynRemoteStore = std::sync::Arc<dyn RemoteStore>;

/// A data source used to pre-populate a namespace before real traffic.
///
/// The engine runs the loader in a background task and writes each returned
/// `(key, value)` pair through its normal write path, so default tags and
/// refresh scheduling apply.
#[async_trait]
pub trait CacheLoader: Send + Sync {
    /// Produces the entries to warm the namespace with.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Loader` if the underlying data source fails.
    /// The engine logs the failure and abandons the warming run.
    async fn load(&self) -> CacheResult<Vec<(String, Value)>>;
}

/// Type alias for a boxed cache loader trait object.
pub type DynCacheLoader = std::sync::Arc<dyn CacheLoader>;
