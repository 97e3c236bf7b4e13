//! The cache entry model: one stored value plus its bookkeeping metadata.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{Duration, OffsetDateTime};

/// A single cached value together with the metadata the tiers need for
/// expiry, eviction, and tag invalidation.
///
/// The `key` is always the full key, namespace prefix included; tiers have
/// no notion of namespaces beyond that prefix. An entry is expired once
/// `now >= created_at + ttl_seconds`, regardless of how recently it was
/// read — access recency only matters for LRU ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Full cache key (`namespace:key`).
    pub key: String,

    /// The cached payload.
    pub value: Value,

    /// When the entry was written.
    pub created_at: OffsetDateTime,

    /// When the entry was last read. Invariant: `accessed_at >= created_at`.
    pub accessed_at: OffsetDateTime,

    /// Time-to-live in seconds, always greater than zero.
    pub ttl_seconds: u64,

    /// Number of successful reads of this entry.
    pub access_count: u64,

    /// Estimated serialized size of the payload, 0 if it could not be
    /// serialized for measurement.
    pub size_bytes: u64,

    /// Labels used for bulk invalidation.
    pub tags: BTreeSet<String>,
}

impl CacheEntry {
    /// Creates a new entry written at the current instant.
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        value: Value,
        ttl_seconds: u64,
        tags: BTreeSet<String>,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        let size_bytes = serde_json::to_vec(&value).map(|b| b.len() as u64).unwrap_or(0);
        Self {
            key: key.into(),
            value,
            created_at: now,
            accessed_at: now,
            ttl_seconds,
            access_count: 0,
            size_bytes,
            tags,
        }
    }

    /// Returns `true` if the entry has outlived its TTL.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc())
    }

    /// Returns `true` if the entry is expired as of `now`.
    ///
    /// A TTL too large to produce a representable deadline means the entry
    /// never expires.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        let ttl = i64::try_from(self.ttl_seconds).unwrap_or(i64::MAX);
        match self.created_at.checked_add(Duration::seconds(ttl)) {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }

    /// Records a successful read: bumps `accessed_at` and `access_count`.
    pub fn touch(&mut self) {
        let now = OffsetDateTime::now_utc();
        if now > self.accessed_at {
            self.accessed_at = now;
        }
        self.access_count += 1;
    }

    /// Time elapsed since the entry was written.
    #[must_use]
    pub fn age(&self) -> Duration {
        OffsetDateTime::now_utc() - self.created_at
    }

    /// Fraction of the TTL still remaining, clamped to `[0, 1]`.
    ///
    /// Refresh-ahead scheduling fires once this drops below the namespace's
    /// `refresh_threshold` remainder.
    #[must_use]
    pub fn remaining_lifetime_fraction(&self) -> f64 {
        let elapsed = self.age().as_seconds_f64();
        let total = self.ttl_seconds as f64;
        (1.0 - elapsed / total).clamp(0.0, 1.0)
    }
}
