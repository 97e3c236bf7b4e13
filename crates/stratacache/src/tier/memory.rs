//! The in-process tier: a bounded, mutex-protected, LRU-evicting store.
//!
//! All state lives behind one `std::sync::Mutex`; critical sections touch
//! only the entry map and the access-order list, never I/O, and never
//! suspend. Expiry is checked lazily on read — there is no background
//! sweep.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use stratacache_core::{CacheEntry, CacheStats, StatsSnapshot};

struct MemoryTierInner {
    entries: HashMap<String, CacheEntry>,
    /// Access order, front = least recently used.
    order: VecDeque<String>,
}

impl MemoryTierInner {
    /// Moves `key` to the most-recently-used position.
    fn promote_key(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push_back(key.to_string());
    }

    fn forget_key(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
    }
}

/// Bounded local cache tier with least-recently-used eviction.
///
/// `len() <= max_entries` holds after every operation: a write that would
/// exceed capacity evicts the least-recently-used entry first.
pub struct MemoryTier {
    inner: Mutex<MemoryTierInner>,
    max_entries: usize,
    stats: CacheStats,
}

impl MemoryTier {
    /// Creates a tier bounded to `max_entries` entries.
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(MemoryTierInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            max_entries,
            stats: CacheStats::new(),
        }
    }

    /// Looks up `key`.
    ///
    /// A live entry is touched (access timestamp and count), moved to the
    /// most-recently-used position, and counted as a hit. An expired entry
    /// is removed and counted as a miss.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let mut inner = self.inner.lock().expect("memory tier lock poisoned");

        let Some(entry) = inner.entries.get_mut(key) else {
            drop(inner);
            self.stats.record_miss();
            return None;
        };

        if entry.is_expired() {
            inner.entries.remove(key);
            inner.forget_key(key);
            drop(inner);
            tracing::debug!(key = %key, "Expired entry removed on read");
            self.stats.record_miss();
            return None;
        }

        entry.touch();
        let entry = entry.clone();
        inner.promote_key(key);
        drop(inner);
        self.stats.record_hit();
        Some(entry)
    }

    /// Inserts or replaces `key`, evicting the least-recently-used entry
    /// first if the write would exceed capacity.
    pub fn set(&self, key: &str, entry: CacheEntry) {
        let mut inner = self.inner.lock().expect("memory tier lock poisoned");

        if !inner.entries.contains_key(key) && inner.entries.len() >= self.max_entries {
            if let Some(victim) = inner.order.pop_front() {
                inner.entries.remove(&victim);
                self.stats.record_eviction();
                tracing::debug!(key = %victim, "Evicted least-recently-used entry");
            }
        }

        inner.entries.insert(key.to_string(), entry);
        inner.promote_key(key);
        drop(inner);
        self.stats.record_write();
    }

    /// Removes `key`, returning `true` if it was present.
    pub fn remove(&self, key: &str) -> bool {
        let mut inner = self.inner.lock().expect("memory tier lock poisoned");
        let removed = inner.entries.remove(key).is_some();
        if removed {
            inner.forget_key(key);
        }
        removed
    }

    /// Removes every entry whose key starts with `prefix`, returning how
    /// many were removed.
    pub fn remove_prefix(&self, prefix: &str) -> usize {
        let mut inner = self.inner.lock().expect("memory tier lock poisoned");
        let victims: Vec<String> = inner
            .entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        for key in &victims {
            inner.entries.remove(key);
        }
        inner.order.retain(|k| !k.starts_with(prefix));
        victims.len()
    }

    /// Removes all entries, returning how many were removed.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock().expect("memory tier lock poisoned");
        let count = inner.entries.len();
        inner.entries.clear();
        inner.order.clear();
        count
    }

    /// Number of live-or-expired entries currently held.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("memory tier lock poisoned").entries.len()
    }

    /// Returns `true` if the tier holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
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
}
