//! Per-tier cache statistics.
//!
//! Counters are process-lifetime state held in atomics so tiers can record
//! from any thread without taking their data lock. They reset only on an
//! explicit `reset()`.

use std::ops::Add;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Monotonic counters for one cache tier.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    evictions: AtomicU64,
    errors: AtomicU64,
}

impl CacheStats {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a read that found a live entry.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a read that found nothing (including lazy-expired entries).
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a write.
    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a capacity eviction.
    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a recovered tier-level failure.
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a point-in-time snapshot of the counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot::from_counts(
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
            self.writes.load(Ordering::Relaxed),
            self.evictions.load(Ordering::Relaxed),
            self.errors.load(Ordering::Relaxed),
        )
    }

    /// Resets all counters to zero.
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.writes.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
    }
}

/// A point-in-time view of one tier's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Reads that found a live entry.
    pub hits: u64,
    /// Reads that found nothing.
    pub misses: u64,
    /// Writes.
    pub writes: u64,
    /// Capacity evictions.
    pub evictions: u64,
    /// Recovered tier-level failures.
    pub errors: u64,
    /// `hits / (hits + misses)`, 0.0 when no accesses occurred.
    pub hit_rate: f64,
}

impl StatsSnapshot {
    fn from_counts(hits: u64, misses: u64, writes: u64, evictions: u64, errors: u64) -> Self {
        let accesses = hits + misses;
        let hit_rate = if accesses == 0 {
            0.0
        } else {
            hits as f64 / accesses as f64
        };
        Self {
            hits,
            misses,
            writes,
            evictions,
            errors,
            hit_rate,
        }
    }
}

impl Add for StatsSnapshot {
    type Output = Self;

    /// Sums counters and re-derives the hit rate, for aggregating the
    /// per-namespace in-process tiers into one engine-level view.
    fn add(self, other: Self) -> Self {
        Self::from_counts(
            self.hits + other.hits,
            self.misses + other.misses,
            self.writes + other.writes,
            self.evictions + other.evictions,
            self.errors + other.errors,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_with_no_accesses() {
        let stats = CacheStats::new();
        assert_eq!(stats.snapshot().hit_rate, 0.0);
    }

    #[test]
    fn test_counters_and_hit_rate() {
        let stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        stats.record_write();
        stats.record_eviction();
        stats.record_error();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.hits, 3);
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.writes, 1);
        assert_eq!(snapshot.evictions, 1);
        assert_eq!(snapshot.errors, 1);
        assert_eq!(snapshot.hit_rate, 0.75);
    }

    #[test]
    fn test_reset() {
        let stats = CacheStats::new();
        stats.record_hit();
        stats.record_error();
        stats.reset();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn test_snapshot_aggregation() {
        let a = CacheStats::new();
        a.record_hit();
        a.record_miss();
        let b = CacheStats::new();
        b.record_hit();
        b.record_write();

        let sum = a.snapshot() + b.snapshot();
        assert_eq!(sum.hits, 2);
        assert_eq!(sum.misses, 1);
        assert_eq!(sum.writes, 1);
        assert!((sum.hit_rate - 2.0 / 3.0).abs() < 1e-9);
    }
}
