//! In-memory doubles for the backend traits, shared by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use stratacache_core::{CacheError, CacheResult, RemoteStore};

/// A `RemoteStore` backed by a plain map, for exercising the distributed
/// tier without a network.
#[derive(Default)]
pub(crate) struct MockRemoteStore {
    data: Mutex<HashMap<String, Vec<u8>>>,
    calls: AtomicU64,
}

impl MockRemoteStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.data.lock().unwrap().contains_key(key)
    }

    /// Plants raw bytes under a key, bypassing entry serialization.
    pub(crate) fn inject_raw(&self, key: &str, bytes: Vec<u8>) {
        self.data.lock().unwrap().insert(key.to_string(), bytes);
    }

    pub(crate) fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStore for MockRemoteStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>, _ttl_seconds: u64) -> CacheResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.data.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.data.lock().unwrap().remove(key).is_some())
    }

    async fn delete_prefix(&self, prefix: &str) -> CacheResult<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut data = self.data.lock().unwrap();
        let victims: Vec<String> = data
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        for key in &victims {
            data.remove(key);
        }
        Ok(victims.len() as u64)
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }

    async fn flush(&self) -> CacheResult<()> {
        self.data.lock().unwrap().clear();
        Ok(())
    }
}

/// A `RemoteStore` whose every call fails, for degraded-mode tests.
pub(crate) struct FailingStore;

#[async_trait]
impl RemoteStore for FailingStore {
    async fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
        Err(CacheError::transport("connection refused"))
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl_seconds: u64) -> CacheResult<()> {
        Err(CacheError::transport("connection refused"))
    }

    async fn delete(&self, _key: &str) -> CacheResult<bool> {
        Err(CacheError::transport("connection refused"))
    }

    async fn delete_prefix(&self, _prefix: &str) -> CacheResult<u64> {
        Err(CacheError::transport("connection refused"))
    }

    async fn ping(&self) -> CacheResult<()> {
        Err(CacheError::transport("connection refused"))
    }

    async fn flush(&self) -> CacheResult<()> {
        Err(CacheError::transport("connection refused"))
    }
}
