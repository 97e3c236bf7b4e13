//! Per-namespace cache configuration.
//!
//! One `CacheConfig` governs one namespace: default TTL, in-process
//! capacity, write policy, which tiers apply, refresh behavior, and the
//! default tags stamped on every entry written under the namespace.
//! All fields carry serde defaults so a config can be loaded from an
//! application configuration file with only the overrides spelled out.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Name of the namespace used when callers do not specify one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Builds the full key a tier sees: `namespace:key`.
#[must_use]
pub fn full_key(namespace: &str, key: &str) -> String {
    format!("{namespace}:{key}")
}

/// Builds the key prefix owned by a namespace, for bulk removal.
#[must_use]
pub fn namespace_prefix(namespace: &str) -> String {
    format!("{namespace}:")
}

/// Write/refresh policy for a namespace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CachePolicy {
    /// Writes go to the cache and the backing store together.
    WriteThrough,
    /// Writes go to the cache first; the backing store is updated later.
    WriteBehind,
    /// The caller populates the cache on demand after a miss.
    #[default]
    CacheAside,
    /// Like cache-aside, plus a background signal when an entry's remaining
    /// lifetime drops below the refresh threshold.
    RefreshAhead,
}

/// One backing store in the cache hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TierKind {
    /// The bounded, mutex-protected, LRU-evicting local store.
    InProcess,
    /// The shared remote key-value store.
    Distributed,
}

fn default_ttl_seconds() -> u64 {
    3600
}

fn default_max_entries() -> usize {
    10_000
}

fn default_tiers() -> Vec<TierKind> {
    vec![TierKind::InProcess, TierKind::Distributed]
}

fn default_refresh_threshold() -> f64 {
    0.8
}

/// Policy for one namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Default TTL for entries written without an explicit TTL.
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,

    /// Capacity bound for the namespace's in-process tier.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Write/refresh policy.
    #[serde(default)]
    pub policy: CachePolicy,

    /// Ordered subset of tiers consulted for this namespace. Reads walk
    /// this list near-to-far; writes fan out to every listed tier.
    #[serde(default = "default_tiers")]
    pub tiers: Vec<TierKind>,

    /// Whether refresh-ahead scheduling is active (only meaningful with
    /// `CachePolicy::RefreshAhead`).
    #[serde(default)]
    pub auto_refresh: bool,

    /// Fraction of the TTL after which a refresh is signalled, in `(0, 1]`.
    #[serde(default = "default_refresh_threshold")]
    pub refresh_threshold: f64,

    /// Default tags applied to all entries written under this namespace.
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
            max_entries: default_max_entries(),
            policy: CachePolicy::default(),
            tiers: default_tiers(),
            auto_refresh: false,
            refresh_threshold: default_refresh_threshold(),
            tags: BTreeSet::new(),
        }
    }
}

impl CacheConfig {
    /// Creates a config with all defaults (see the module docs for values).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default TTL.
    #[must_use]
    pub fn with_ttl_seconds(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    /// Sets the in-process capacity bound.
    #[must_use]
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Sets the write/refresh policy.
    #[must_use]
    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the ordered list of tiers.
    #[must_use]
    pub fn with_tiers(mut self, tiers: Vec<TierKind>) -> Self {
        self.tiers = tiers;
        self
    }

    /// Enables or disables refresh-ahead scheduling.
    #[must_use]
    pub fn with_auto_refresh(mut self, auto_refresh: bool) -> Self {
        self.auto_refresh = auto_refresh;
        self
    }

    /// Sets the refresh threshold.
    #[must_use]
    pub fn with_refresh_threshold(mut self, refresh_threshold: f64) -> Self {
        self.refresh_threshold = refresh_threshold;
        self
    }

    /// Adds a default tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Returns `true` if the given tier is configured for this namespace.
    #[must_use]
    pub fn has_tier(&self, tier: TierKind) -> bool {
        self.tiers.contains(&tier)
    }

    /// Delay after a write at which a refresh-ahead task should fire.
    #[must_use]
    pub fn refresh_delay_seconds(&self, ttl_seconds: u64) -> f64 {
        ttl_seconds as f64 * self.refresh_threshold
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidConfig` if `refresh_threshold` is outside
    /// `(0, 1]`, if `ttl_seconds` or `max_entries` is zero, or if `tiers`
    /// is empty (a namespace that no tier serves cannot cache anything).
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.ttl_seconds == 0 {
            return Err(CacheError::invalid_config("ttl_seconds must be > 0"));
        }
        if self.max_entries == 0 {
            return Err(CacheError::invalid_config("max_entries must be > 0"));
        }
        if self.tiers.is_empty() {
            return Err(CacheError::invalid_config(
                "tiers must name at least one tier",
            ));
        }
        if !(self.refresh_threshold > 0.0 && self.refresh_threshold <= 1.0) {
            return Err(CacheError::invalid_config(format!(
                "refresh_threshold must be in (0, 1], got {}",
                self.refresh_threshold
            )));
        }
        Ok(())
    }
}
