//! The cache orchestrator: one read/write contract over all tiers.
//!
//! `CacheEngine` is the only component callers interact with. Reads walk a
//! namespace's configured tiers near-to-far and promote on a far-tier hit;
//! writes fan out to every configured tier; tag invalidation, namespace
//! clearing, warming, and refresh-ahead scheduling are coordinated here.
//!
//! The engine is an explicitly constructed, dependency-injected instance —
//! construct it once, wrap it in an `Arc`, and pass it to whatever needs
//! caching. `initialize()` and `shutdown()` bracket its lifecycle.
//!
//! Tier-level failures never reach callers: a fully-down distributed tier
//! degrades the system to in-process-only caching with a reduced hit rate,
//! not a functional outage.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use stratacache_core::{
    CacheConfig, CacheEntry, CachePolicy, CacheResult, DEFAULT_NAMESPACE, DynCacheLoader,
    DynRemoteStore, StatsSnapshot, TierKind, full_key, namespace_prefix,
};

use crate::tasks::TaskRegistry;
use crate::tier::{DistributedTier, MemoryTier};

/// Aggregated engine-level statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineStats {
    /// Sum over all per-namespace in-process tiers.
    pub in_process: StatsSnapshot,
    /// Distributed tier counters, if a remote store is configured.
    pub distributed: Option<StatsSnapshot>,
    /// Refresh-ahead signals fired so far.
    pub refreshes_triggered: u64,
    /// Refresh tasks currently pending.
    pub pending_refreshes: usize,
    /// Warming tasks currently in flight.
    pub active_warmups: usize,
    /// Reads no configured tier could serve, counted as misses here: a
    /// distributed-only namespace on an engine built without a remote
    /// store lands in this bucket.
    pub unserved_reads: u64,
}

/// Multi-tier cache orchestrator.
pub struct CacheEngine {
    namespaces: DashMap<String, CacheConfig>,
    /// One in-process tier per namespace, created lazily from that
    /// namespace's `max_entries`. Tiers themselves stay namespace-blind;
    /// only the engine owns this mapping.
    memory: DashMap<String, Arc<MemoryTier>>,
    distributed: Option<Arc<DistributedTier>>,
    refresh_tasks: TaskRegistry,
    /// In-flight warming tasks, keyed by namespace.
    warm_tasks: Arc<DashMap<String, JoinHandle<()>>>,
    /// Misses with no tier to attribute them to.
    unserved: AtomicU64,
}

impl CacheEngine {
    /// Creates an engine with no distributed tier. Namespaces configured
    /// with [`TierKind::Distributed`] simply skip that tier.
    #[must_use]
    pub fn new() -> Self {
        Self {
            namespaces: DashMap::new(),
            memory: DashMap::new(),
            distributed: None,
            refresh_tasks: TaskRegistry::new(),
            warm_tasks: Arc::new(DashMap::new()),
            unserved: AtomicU64::new(0),
        }
    }

    /// Creates an engine with a distributed tier over the given store.
    #[must_use]
    pub fn with_remote_store(store: DynRemoteStore) -> Self {
        let mut engine = Self::new();
        engine.distributed = Some(Arc::new(DistributedTier::new(store)));
        engine
    }

    /// Verifies remote connectivity and logs the startup mode.
    ///
    /// A failed ping is not an error: the engine starts in degraded,
    /// in-process-only mode and the distributed tier keeps counting its
    /// own failures until the store comes back.
    pub async fn initialize(&self) {
        match &self.distributed {
            Some(tier) => match tier.ping().await {
                Ok(()) => info!("Cache engine initialized, distributed tier reachable"),
                Err(e) => warn!(
                    error = %e,
                    "Cache engine initialized degraded, distributed tier unreachable"
                ),
            },
            None => info!("Cache engine initialized, in-process tiers only"),
        }
    }

    /// Cancels all pending refresh and warming tasks. Idempotent.
    pub fn shutdown(&self) {
        self.refresh_tasks.cancel_all();
        let namespaces: Vec<String> = self.warm_tasks.iter().map(|e| e.key().clone()).collect();
        for namespace in namespaces {
            if let Some((_, handle)) = self.warm_tasks.remove(&namespace) {
                handle.abort();
            }
        }
        info!("Cache engine shut down");
    }

    /// Registers or replaces a namespace's policy. Idempotent; last write
    /// wins.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidConfig` if the config fails validation.
    pub fn configure(&self, namespace: &str, config: CacheConfig) -> CacheResult<()> {
        config.validate()?;
        debug!(
            namespace = %namespace,
            policy = ?config.policy,
            ttl_seconds = config.ttl_seconds,
            "Namespace configured"
        );
        self.namespaces.insert(namespace.to_string(), config);
        // A changed max_entries only applies to a tier created after this
        // point; the existing tier keeps its bound until the namespace is
        // cleared.
        Ok(())
    }

    /// Resolves a namespace's config, falling back to the defaults for
    /// unknown namespaces rather than failing the call.
    ///
    /// Every distinct namespace string a caller uses gets a config lookup
    /// here and, on first use, an in-process tier below; namespace names
    /// should come from a bounded set, not from request data.
    fn resolve_config(&self, namespace: &str) -> CacheConfig {
        self.namespaces
            .get(namespace)
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    fn memory_tier(&self, namespace: &str, config: &CacheConfig) -> Arc<MemoryTier> {
        self.memory
            .entry(namespace.to_string())
            .or_insert_with(|| Arc::new(MemoryTier::new(config.max_entries)))
            .clone()
    }

    /// Looks up `key` under the `"default"` namespace.
    pub async fn get_default(&self, key: &str) -> Option<Value> {
        self.get(DEFAULT_NAMESPACE, key).await
    }

    /// Looks up `key` in the namespace's tiers, near-to-far.
    ///
    /// The walk stops at the first hit; a hit in the distributed tier is
    /// promoted into the in-process tier (fresh lifetime, namespace TTL)
    /// when that tier is configured, so a subsequent read is local.
    pub async fn get(&self, namespace: &str, key: &str) -> Option<Value> {
        let config = self.resolve_config(namespace);
        let key = full_key(namespace, key);

        // Whether any tier actually answered the lookup; a consulted tier
        // records its own hit or miss.
        let mut consulted = false;
        for tier in &config.tiers {
            match tier {
                TierKind::InProcess => {
                    consulted = true;
                    if let Some(entry) = self.memory_tier(namespace, &config).get(&key) {
                        return Some(entry.value);
                    }
                }
                TierKind::Distributed => {
                    let Some(distributed) = &self.distributed else {
                        continue;
                    };
                    consulted = true;
                    if let Some(entry) = distributed.get(&key).await {
                        if config.has_tier(TierKind::InProcess) {
                            let promoted = CacheEntry::new(
                                key.clone(),
                                entry.value.clone(),
                                config.ttl_seconds,
                                entry.tags.clone(),
                            );
                            self.memory_tier(namespace, &config).set(&key, promoted);
                            debug!(key = %key, "Promoted entry into in-process tier");
                        }
                        return Some(entry.value);
                    }
                }
            }
        }

        if !consulted {
            // Still a miss, just with no tier to attribute it to.
            self.unserved.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "No usable tier for lookup");
        }
        None
    }

    /// Writes `value` under the `"default"` namespace.
    pub async fn set_default(&self, key: &str, value: Value) {
        self.set(DEFAULT_NAMESPACE, key, value, None).await;
    }

    /// Writes `value` to every tier configured for the namespace.
    ///
    /// `ttl` falls back to the namespace default. Failures on one tier do
    /// not abort writes to the remaining tiers; each failure is counted in
    /// that tier's own `errors` stat.
    pub async fn set(&self, namespace: &str, key: &str, value: Value, ttl: Option<u64>) {
        self.set_tagged(namespace, key, value, ttl, BTreeSet::new())
            .await;
    }

    /// Like [`set`](Self::set), with extra tags merged into the namespace's
    /// default tags.
    pub async fn set_tagged(
        &self,
        namespace: &str,
        key: &str,
        value: Value,
        ttl: Option<u64>,
        extra_tags: BTreeSet<String>,
    ) {
        let config = self.resolve_config(namespace);
        let full = full_key(namespace, key);
        let ttl_seconds = ttl.unwrap_or(config.ttl_seconds);

        let mut tags = config.tags.clone();
        tags.extend(extra_tags);
        let entry = CacheEntry::new(full.clone(), value, ttl_seconds, tags);

        for tier in &config.tiers {
            match tier {
                TierKind::InProcess => {
                    self.memory_tier(namespace, &config).set(&full, entry.clone());
                }
                TierKind::Distributed => {
                    if let Some(distributed) = &self.distributed {
                        distributed.set(&entry).await;
                    }
                }
            }
        }

        // A newer write supersedes any pending refresh signal for the key;
        // refresh-ahead reschedules from the fresh TTL.
        if config.policy == CachePolicy::RefreshAhead && config.auto_refresh {
            let delay = Duration::from_secs_f64(config.refresh_delay_seconds(ttl_seconds));
            self.refresh_tasks.schedule(&full, delay);
        } else {
            self.refresh_tasks.cancel(&full);
        }
    }

    /// Removes `key` from the `"default"` namespace.
    pub async fn remove_default(&self, key: &str) -> bool {
        self.remove(DEFAULT_NAMESPACE, key).await
    }

    /// Removes `key` from all configured tiers and cancels any pending
    /// refresh task for it. Returns `true` if the key was present in at
    /// least one tier.
    pub async fn remove(&self, namespace: &str, key: &str) -> bool {
        let config = self.resolve_config(namespace);
        let full = full_key(namespace, key);

        self.refresh_tasks.cancel(&full);

        let mut removed = false;
        for tier in &config.tiers {
            match tier {
                TierKind::InProcess => {
                    removed |= self.memory_tier(namespace, &config).remove(&full);
                }
                TierKind::Distributed => {
                    if let Some(distributed) = &self.distributed {
                        removed |= distributed.remove(&full).await;
                    }
                }
            }
        }
        removed
    }

    /// Invalidates entries carrying any of `tags` in the namespace.
    ///
    /// Coarse-grained: any tag invalidation clears the whole namespace; no
    /// per-entry tag index is kept. Returns the number of entries affected.
    pub async fn invalidate_by_tags(&self, namespace: &str, tags: &[String]) -> usize {
        debug!(namespace = %namespace, tags = ?tags, "Tag invalidation clears namespace");
        self.clear_namespace(namespace).await
    }

    /// Cancels the namespace's pending refresh/warm tasks, then clears it
    /// from every configured tier. Idempotent: a second call removes
    /// nothing and raises no error. Returns the number of entries removed.
    pub async fn clear_namespace(&self, namespace: &str) -> usize {
        let config = self.resolve_config(namespace);
        let prefix = namespace_prefix(namespace);

        self.refresh_tasks.cancel_prefix(&prefix);
        if let Some((_, handle)) = self.warm_tasks.remove(namespace) {
            handle.abort();
        }

        let mut local_count = None;
        let mut remote_count = 0u64;
        for tier in &config.tiers {
            match tier {
                TierKind::InProcess => {
                    if let Some(tier) = self.memory.get(namespace) {
                        local_count = Some(tier.clear());
                    } else {
                        local_count = Some(0);
                    }
                }
                TierKind::Distributed => {
                    if let Some(distributed) = &self.distributed {
                        remote_count = distributed.remove_prefix(&prefix).await;
                    }
                }
            }
        }

        // The in-process tier is authoritative for the affected count when
        // configured; the remote count double-counts the same logical
        // entries.
        let count = local_count.unwrap_or(remote_count as usize);
        debug!(namespace = %namespace, count, "Namespace cleared");
        count
    }

    /// Pre-populates a namespace from `loader` in a background task.
    ///
    /// At most one warming run per namespace is in flight at a time; a
    /// second call while one is running does nothing and returns `false`.
    /// The task removes itself from the registry on completion, success or
    /// failure, and loader failures are logged rather than propagated.
    pub fn warm_cache(self: &Arc<Self>, namespace: &str, loader: DynCacheLoader) -> bool {
        // Claim the namespace slot under the entry guard: concurrent calls
        // for the same namespace serialize here, so exactly one spawns a
        // loader, and the task cannot deregister itself before its handle
        // is registered.
        let slot = match self.warm_tasks.entry(namespace.to_string()) {
            Entry::Occupied(_) => {
                debug!(namespace = %namespace, "Warming already in flight, skipping");
                return false;
            }
            Entry::Vacant(vacant) => vacant,
        };

        let engine = Arc::clone(self);
        let warm_tasks = Arc::clone(&self.warm_tasks);
        let task_namespace = namespace.to_string();

        let handle = tokio::spawn(async move {
            match loader.load().await {
                Ok(pairs) => {
                    let count = pairs.len();
                    for (key, value) in pairs {
                        engine.set(&task_namespace, &key, value, None).await;
                    }
                    info!(namespace = %task_namespace, entries = count, "Cache warmed");
                }
                Err(e) => {
                    warn!(namespace = %task_namespace, error = %e, "Cache warming failed");
                }
            }
            warm_tasks.remove(&task_namespace);
        });

        slot.insert(handle);
        true
    }

    /// Aggregated statistics across all tiers and task registries.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        let in_process = self
            .memory
            .iter()
            .map(|tier| tier.stats())
            .fold(StatsSnapshot::default(), |acc, s| acc + s);

        EngineStats {
            in_process,
            distributed: self.distributed.as_ref().map(|t| t.stats()),
            refreshes_triggered: self.refresh_tasks.triggered(),
            pending_refreshes: self.refresh_tasks.pending(),
            active_warmups: self.warm_tasks.len(),
            unserved_reads: self.unserved.load(Ordering::Relaxed),
        }
    }

    /// Resets all tier counters. Counters otherwise only grow for the
    /// lifetime of the process.
    pub fn reset_stats(&self) {
        for tier in self.memory.iter() {
            tier.reset_stats();
        }
        if let Some(distributed) = &self.distributed {
            distributed.reset_stats();
        }
    }
}

impl Default for CacheEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingStore, MockRemoteStore};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use stratacache_core::{CacheError, CacheLoader};

    fn memory_only_config() -> CacheConfig {
        CacheConfig::new().with_tiers(vec![TierKind::InProcess])
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let engine = CacheEngine::new();
        engine.set("default", "greeting", json!("hello"), None).await;
        assert_eq!(engine.get("default", "greeting").await, Some(json!("hello")));
        assert_eq!(engine.get_default("greeting").await, Some(json!("hello")));
    }

    #[tokio::test]
    async fn test_unknown_namespace_falls_back_to_defaults() {
        let engine = CacheEngine::new();
        // No configure() call for "adhoc": defaults apply, nothing errors.
        engine.set("adhoc", "k", json!(1), None).await;
        assert_eq!(engine.get("adhoc", "k").await, Some(json!(1)));
    }

    #[tokio::test]
    async fn test_configure_rejects_invalid_config() {
        let engine = CacheEngine::new();
        let result = engine.configure("bad", CacheConfig::new().with_refresh_threshold(2.0));
        assert!(matches!(result, Err(CacheError::InvalidConfig { .. })));
    }

    #[tokio::test]
    async fn test_configure_last_write_wins() {
        let engine = CacheEngine::new();
        engine
            .configure("ns", CacheConfig::new().with_ttl_seconds(10))
            .unwrap();
        engine
            .configure("ns", CacheConfig::new().with_ttl_seconds(99))
            .unwrap();
        assert_eq!(engine.resolve_config("ns").ttl_seconds, 99);
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let engine = CacheEngine::new();
        engine.set("a", "k", json!("from-a"), None).await;
        engine.set("b", "k", json!("from-b"), None).await;
        assert_eq!(engine.get("a", "k").await, Some(json!("from-a")));
        assert_eq!(engine.get("b", "k").await, Some(json!("from-b")));
    }

    #[tokio::test]
    async fn test_promotion_from_distributed_tier() {
        let store = Arc::new(MockRemoteStore::new());
        let engine = CacheEngine::with_remote_store(store.clone());

        // Present only in the distributed tier.
        let entry = CacheEntry::new("default:far", json!(42), 60, BTreeSet::new());
        engine.distributed.as_ref().unwrap().set(&entry).await;

        assert_eq!(engine.get("default", "far").await, Some(json!(42)));

        // Read-your-write promotion: now present in-process; a second read
        // does not touch the remote store.
        let calls_after_first_get = store.call_count();
        assert_eq!(engine.get("default", "far").await, Some(json!(42)));
        assert_eq!(store.call_count(), calls_after_first_get);

        let stats = engine.stats();
        assert_eq!(stats.in_process.hits, 1);
        assert_eq!(stats.distributed.unwrap().hits, 1);
    }

    #[tokio::test]
    async fn test_storeless_distributed_lookup_counts_as_unserved_miss() {
        let engine = CacheEngine::new();
        engine
            .configure(
                "remote-only",
                CacheConfig::new().with_tiers(vec![TierKind::Distributed]),
            )
            .unwrap();

        assert!(engine.get("remote-only", "k").await.is_none());
        assert!(engine.get("remote-only", "k").await.is_none());

        let stats = engine.stats();
        assert_eq!(stats.unserved_reads, 2);
        assert_eq!(stats.in_process, StatsSnapshot::default());
        assert!(stats.distributed.is_none());
    }

    #[tokio::test]
    async fn test_degraded_mode_with_failing_store() {
        let engine = CacheEngine::with_remote_store(Arc::new(FailingStore));
        engine.initialize().await;

        engine.set("default", "k", json!("still works"), None).await;
        assert_eq!(engine.get("default", "k").await, Some(json!("still works")));

        let stats = engine.stats();
        assert!(stats.distributed.unwrap().errors > 0);
    }

    #[tokio::test]
    async fn test_remove_reports_presence() {
        let engine = CacheEngine::new();
        engine.set("default", "k", json!(1), None).await;
        assert!(engine.remove("default", "k").await);
        assert!(!engine.remove("default", "k").await);
        assert!(engine.get("default", "k").await.is_none());
    }

    #[tokio::test]
    async fn test_tag_invalidation_clears_namespace() {
        let engine = CacheEngine::new();
        engine
            .configure("users", memory_only_config().with_tag("user_data"))
            .unwrap();
        for i in 0..5 {
            engine.set("users", &format!("u{i}"), json!(i), None).await;
        }

        let affected = engine
            .invalidate_by_tags("users", &["user_data".to_string()])
            .await;
        assert_eq!(affected, 5);

        for i in 0..5 {
            assert!(engine.get("users", &format!("u{i}")).await.is_none());
        }
    }

    #[tokio::test]
    async fn test_clear_namespace_is_idempotent() {
        let engine = CacheEngine::new();
        engine.set("ns", "k", json!(1), None).await;
        assert_eq!(engine.clear_namespace("ns").await, 1);
        assert_eq!(engine.clear_namespace("ns").await, 0);
        // A namespace that never existed clears cleanly too.
        assert_eq!(engine.clear_namespace("ghost").await, 0);
    }

    #[tokio::test]
    async fn test_clear_namespace_reaches_remote_tier() {
        let store = Arc::new(MockRemoteStore::new());
        let engine = CacheEngine::with_remote_store(store.clone());
        engine.set("users", "1", json!(1), None).await;
        engine.set("orders", "1", json!(1), None).await;

        engine.clear_namespace("users").await;

        assert!(!store.contains("users:1"));
        assert!(store.contains("orders:1"));
    }

    fn refresh_ahead_config(ttl_seconds: u64) -> CacheConfig {
        memory_only_config()
            .with_ttl_seconds(ttl_seconds)
            .with_policy(CachePolicy::RefreshAhead)
            .with_auto_refresh(true)
            .with_refresh_threshold(0.5)
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_ahead_fires_after_threshold_delay() {
        let engine = CacheEngine::new();
        engine.configure("ra", refresh_ahead_config(100)).unwrap();
        engine.set("ra", "k", json!(1), None).await;
        assert_eq!(engine.stats().pending_refreshes, 1);

        // Threshold 0.5 of a 100s TTL: fires at 50s.
        tokio::time::sleep(Duration::from_secs(51)).await;

        let stats = engine.stats();
        assert_eq!(stats.refreshes_triggered, 1);
        assert_eq!(stats.pending_refreshes, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_cancels_pending_refresh() {
        let engine = CacheEngine::new();
        engine.configure("ra", refresh_ahead_config(100)).unwrap();
        engine.set("ra", "k", json!(1), None).await;
        assert!(engine.remove("ra", "k").await);

        tokio::time::sleep(Duration::from_secs(200)).await;

        // The task never fired.
        assert_eq!(engine.stats().refreshes_triggered, 0);
        assert_eq!(engine.stats().pending_refreshes, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_set_reschedules_refresh() {
        let engine = CacheEngine::new();
        engine.configure("ra", refresh_ahead_config(100)).unwrap();
        engine.set("ra", "k", json!(1), None).await;

        tokio::time::sleep(Duration::from_secs(40)).await;
        engine.set("ra", "k", json!(2), None).await;

        // Past the first write's deadline, before the second's.
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(engine.stats().refreshes_triggered, 0);

        tokio::time::sleep(Duration::from_secs(40)).await;
        assert_eq!(engine.stats().refreshes_triggered, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_refresh_policy_schedules_nothing() {
        let engine = CacheEngine::new();
        engine.configure("plain", memory_only_config()).unwrap();
        engine.set("plain", "k", json!(1), None).await;
        assert_eq!(engine.stats().pending_refreshes, 0);
    }

    struct CountingLoader {
        pairs: Vec<(String, Value)>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CacheLoader for CountingLoader {
        async fn load(&self) -> CacheResult<Vec<(String, Value)>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.pairs.clone())
        }
    }

    struct FailingLoader;

    #[async_trait]
    impl CacheLoader for FailingLoader {
        async fn load(&self) -> CacheResult<Vec<(String, Value)>> {
            Err(CacheError::loader("upstream unavailable"))
        }
    }

    #[tokio::test]
    async fn test_warm_cache_populates_namespace() {
        let engine = Arc::new(CacheEngine::new());
        let loader = Arc::new(CountingLoader {
            pairs: vec![
                ("a".to_string(), json!(1)),
                ("b".to_string(), json!(2)),
            ],
            calls: AtomicUsize::new(0),
        });

        assert!(engine.warm_cache("warm", loader.clone()));
        // Wait for the background task to finish and deregister.
        while engine.stats().active_warmups > 0 {
            tokio::task::yield_now().await;
        }

        assert_eq!(engine.get("warm", "a").await, Some(json!(1)));
        assert_eq!(engine.get("warm", "b").await, Some(json!(2)));
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_warm_cache_deduplicates_per_namespace() {
        let engine = Arc::new(CacheEngine::new());

        struct StallingLoader;
        #[async_trait]
        impl CacheLoader for StallingLoader {
            async fn load(&self) -> CacheResult<Vec<(String, Value)>> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(vec![])
            }
        }

        assert!(engine.warm_cache("slow", Arc::new(StallingLoader)));
        assert!(!engine.warm_cache("slow", Arc::new(StallingLoader)));
        // A different namespace is unaffected.
        assert!(engine.warm_cache("other", Arc::new(StallingLoader)));
        engine.shutdown();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_warm_calls_admit_exactly_one() {
        let engine = Arc::new(CacheEngine::new());

        // Blocks in load() until released, so the first run is still in
        // flight while every other caller races for the slot.
        struct GatedLoader {
            calls: AtomicUsize,
            release: tokio::sync::Notify,
        }
        #[async_trait]
        impl CacheLoader for GatedLoader {
            async fn load(&self) -> CacheResult<Vec<(String, Value)>> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                self.release.notified().await;
                Ok(vec![])
            }
        }

        let loader = Arc::new(GatedLoader {
            calls: AtomicUsize::new(0),
            release: tokio::sync::Notify::new(),
        });

        let mut joins = Vec::new();
        for _ in 0..8 {
            let engine = Arc::clone(&engine);
            let loader = loader.clone();
            joins.push(tokio::spawn(async move { engine.warm_cache("contended", loader) }));
        }
        let mut admitted = 0;
        for join in joins {
            if join.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);

        loader.release.notify_one();
        while engine.stats().active_warmups > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_warm_cache_failure_deregisters() {
        let engine = Arc::new(CacheEngine::new());
        assert!(engine.warm_cache("warm", Arc::new(FailingLoader)));
        while engine.stats().active_warmups > 0 {
            tokio::task::yield_now().await;
        }
        // The slot is free again after a failure.
        assert!(engine.warm_cache("warm", Arc::new(FailingLoader)));
        engine.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_everything() {
        let engine = Arc::new(CacheEngine::new());
        engine.configure("ra", refresh_ahead_config(100)).unwrap();
        engine.set("ra", "k", json!(1), None).await;

        engine.shutdown();
        engine.shutdown(); // idempotent

        tokio::time::sleep(Duration::from_secs(200)).await;
        assert_eq!(engine.stats().refreshes_triggered, 0);
    }

    #[tokio::test]
    async fn test_stats_reset() {
        let engine = CacheEngine::new();
        engine.set("default", "k", json!(1), None).await;
        engine.get("default", "k").await;
        assert!(engine.stats().in_process.hits > 0);

        engine.reset_stats();
        assert_eq!(engine.stats().in_process, StatsSnapshot::default());
    }

    #[tokio::test]
    async fn test_per_namespace_capacity() {
        let engine = CacheEngine::new();
        engine
            .configure("tiny", memory_only_config().with_max_entries(2))
            .unwrap();
        for i in 0..5 {
            engine.set("tiny", &format!("k{i}"), json!(i), None).await;
        }
        assert!(engine.stats().in_process.evictions >= 3);
        // The two most recent keys survive.
        assert_eq!(engine.get("tiny", "k4").await, Some(json!(4)));
        assert_eq!(engine.get("tiny", "k3").await, Some(json!(3)));
        assert!(engine.get("tiny", "k0").await.is_none());
    }
}
