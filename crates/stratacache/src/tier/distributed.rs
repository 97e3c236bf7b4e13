//! The distributed tier: a thin adapter over a shared remote key-value
//! store.
//!
//! Every operation is a network call and none of them may crash the
//! caller: transport and deserialization failures are caught here, counted
//! in the tier's `errors`, logged with the key, and surfaced as a miss or
//! no-op. Capacity and eviction are the remote store's concern — this tier
//! only serializes entries on the way out and re-checks expiry on the way
//! back in, since the remote store's own expiry is independent.

use stratacache_core::{CacheEntry, CacheError, CacheStats, DynRemoteStore, StatsSnapshot};

/// Cache tier backed by a [`stratacache_core::RemoteStore`].
pub struct DistributedTier {
    store: DynRemoteStore,
    stats: CacheStats,
}

impl DistributedTier {
    /// Creates a tier over the given remote store.
    #[must_use]
    pub fn new(store: DynRemoteStore) -> Self {
        Self {
            store,
            stats: CacheStats::new(),
        }
    }

    /// Looks up `key` in the remote store.
    ///
    /// Transport failures, undecodable payloads, and lazily-detected expiry
    /// all read as a miss. An expired entry is deleted remotely on a
    /// best-effort basis.
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        let bytes = match self.store.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                self.stats.record_miss();
                return None;
            }
            Err(e) => {
                self.record_failure(key, &e);
                self.stats.record_miss();
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                let err = CacheError::serialization(key, e.to_string());
                self.record_failure(key, &err);
                self.stats.record_miss();
                return None;
            }
        };

        if entry.is_expired() {
            if let Err(e) = self.store.delete(key).await {
                self.record_failure(key, &e);
            }
            tracing::debug!(key = %key, "Expired remote entry discarded on read");
            self.stats.record_miss();
            return None;
        }

        self.stats.record_hit();
        Some(entry)
    }

    /// Writes `entry` to the remote store under its full key.
    ///
    /// Returns `true` if the write reached the store; a failed write is
    /// counted and logged but never propagated.
    pub async fn set(&self, entry: &CacheEntry) -> bool {
        let bytes = match serde_json::to_vec(entry) {
            Ok(bytes) => bytes,
            Err(e) => {
                let err = CacheError::serialization(&entry.key, e.to_string());
                self.record_failure(&entry.key, &err);
                return false;
            }
        };

        match self.store.set(&entry.key, bytes, entry.ttl_seconds).await {
            Ok(()) => {
                self.stats.record_write();
                true
            }
            Err(e) => {
                self.record_failure(&entry.key, &e);
                false
            }
        }
    }

    /// Removes `key`, returning `true` if the store reported it present.
    pub async fn remove(&self, key: &str) -> bool {
        match self.store.delete(key).await {
            Ok(removed) => removed,
            Err(e) => {
                self.record_failure(key, &e);
                false
            }
        }
    }

    /// Removes every key starting with `prefix`, returning how many were
    /// removed (0 on transport failure).
    pub async fn remove_prefix(&self, prefix: &str) -> u64 {
        match self.store.delete_prefix(prefix).await {
            Ok(count) => count,
            Err(e) => {
                self.record_failure(prefix, &e);
                0
            }
        }
    }

    /// Flushes the remote store.
    pub async fn clear(&self) {
        if let Err(e) = self.store.flush().await {
            self.record_failure("*", &e);
        }
    }

    /// Checks connectivity to the remote store.
    ///
    /// # Errors
    ///
    /// Returns the transport error so the engine can log degraded startup;
    /// the engine itself never propagates it further.
    pub async fn ping(&self) -> Result<(), CacheError> {
        self.store.ping().await
    }

    /// Point-in-time statistics snapshot.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Resets the tier's counters.
    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    fn record_failure(&self, key: &str, error: &CacheError) {
        self.stats.record_error();
        tracing::warn!(
            key = %key,
            category = %error.category(),
            error = %error,
            "Distributed tier operation failed, degrading to miss"
        );
    }
}
