//! Registry of scheduled refresh-ahead tasks.
//!
//! Each refresh-ahead write schedules one task per full key. The task
//! sleeps until the entry's remaining lifetime drops below the namespace's
//! refresh threshold, then logs a "refresh triggered" event — actually
//! re-fetching fresh data is the caller's job via a subsequent `set`. A
//! newer write or a removal of the key cancels the pending task so stale
//! refresh signals never fire for replaced data.
//!
//! The registry entry is removed in every terminal state (completed,
//! failed, cancelled) so task handles never leak.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::task::JoinHandle;

/// One registered refresh task. The generation lets the fired task
/// deregister only itself: by the time it removes its entry, a concurrent
/// reschedule may already have replaced it with a newer task.
struct ScheduledRefresh {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Owned map of cancellable refresh-task handles, keyed by full cache key.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: Arc<DashMap<String, ScheduledRefresh>>,
    triggered: Arc<AtomicU64>,
    generation: AtomicU64,
}

impl TaskRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules a refresh signal for `key` after `delay`, replacing (and
    /// cancelling) any task already pending for the key.
    pub fn schedule(&self, key: &str, delay: Duration) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let tasks = Arc::clone(&self.tasks);
        let triggered = Arc::clone(&self.triggered);
        let task_key = key.to_string();

        let fire = async move {
            tokio::time::sleep(delay).await;
            triggered.fetch_add(1, Ordering::SeqCst);
            tracing::info!(key = %task_key, "Refresh triggered, entry due for re-fetch");
            tasks.remove_if(&task_key, |_, task| task.generation == generation);
        };

        // Replace-and-spawn under the entry guard: concurrent schedules of
        // the same key serialize here, and the spawned task cannot touch the
        // registry before its own handle is registered.
        match self.tasks.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                occupied.get().handle.abort();
                occupied.insert(ScheduledRefresh { generation, handle: tokio::spawn(fire) });
            }
            Entry::Vacant(vacant) => {
                vacant.insert(ScheduledRefresh { generation, handle: tokio::spawn(fire) });
            }
        }
        tracing::debug!(key = %key, delay_secs = delay.as_secs_f64(), "Refresh scheduled");
    }

    /// Cancels the pending task for `key`, if any. Cancelling a key with no
    /// pending task (or an already-finished one) is a no-op.
    pub fn cancel(&self, key: &str) -> bool {
        if let Some((_, task)) = self.tasks.remove(key) {
            task.handle.abort();
            tracing::debug!(key = %key, "Refresh cancelled");
            true
        } else {
            false
        }
    }

    /// Cancels every pending task whose key starts with `prefix`,
    /// returning how many were cancelled.
    pub fn cancel_prefix(&self, prefix: &str) -> usize {
        let victims: Vec<String> = self
            .tasks
            .iter()
            .map(|e| e.key().clone())
            .filter(|k| k.starts_with(prefix))
            .collect();
        victims.iter().filter(|k| self.cancel(k)).count()
    }

    /// Cancels every pending task.
    pub fn cancel_all(&self) {
        let keys: Vec<String> = self.tasks.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            self.cancel(&key);
        }
    }

    /// Number of currently pending tasks.
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Number of refresh signals that have fired since construction.
    pub fn triggered(&self) -> u64 {
        self.triggered.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_schedule_fires_after_delay() {
        let registry = TaskRegistry::new();
        registry.schedule("default:k", Duration::from_secs(10));
        assert_eq!(registry.pending(), 1);
        assert_eq!(registry.triggered(), 0);

        tokio::time::sleep(Duration::from_secs(11)).await;

        assert_eq!(registry.triggered(), 1);
        assert_eq!(registry.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_fire() {
        let registry = TaskRegistry::new();
        registry.schedule("default:k", Duration::from_secs(10));
        assert!(registry.cancel("default:k"));

        tokio::time::sleep(Duration::from_secs(20)).await;

        assert_eq!(registry.triggered(), 0);
        assert_eq!(registry.pending(), 0);
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let registry = TaskRegistry::new();
        registry.schedule("default:k", Duration::from_secs(10));
        assert!(registry.cancel("default:k"));
        assert!(!registry.cancel("default:k"));
        assert!(!registry.cancel("default:never-scheduled"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_pending_task() {
        let registry = TaskRegistry::new();
        registry.schedule("default:k", Duration::from_secs(10));
        registry.schedule("default:k", Duration::from_secs(100));
        assert_eq!(registry.pending(), 1);

        // Past the first deadline but before the second: nothing fires.
        tokio::time::sleep(Duration::from_secs(50)).await;
        assert_eq!(registry.triggered(), 0);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(registry.triggered(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delay_task_deregisters_itself() {
        let registry = TaskRegistry::new();
        registry.schedule("default:k", Duration::ZERO);

        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(registry.triggered(), 1);
        assert_eq!(registry.pending(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_schedules_keep_one_task_per_key() {
        let registry = Arc::new(TaskRegistry::new());

        let mut joins = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            joins.push(tokio::spawn(async move {
                registry.schedule("default:contended", Duration::from_secs(300));
            }));
        }
        for join in joins {
            join.await.unwrap();
        }

        assert_eq!(registry.pending(), 1);
        assert_eq!(registry.triggered(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prefix() {
        let registry = TaskRegistry::new();
        registry.schedule("users:1", Duration::from_secs(10));
        registry.schedule("users:2", Duration::from_secs(10));
        registry.schedule("orders:1", Duration::from_secs(10));

        assert_eq!(registry.cancel_prefix("users:"), 2);
        assert_eq!(registry.pending(), 1);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(registry.triggered(), 1);
    }
}
