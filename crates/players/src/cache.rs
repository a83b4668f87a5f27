use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

struct CacheEntry<T> {
    value: T,
    created_at: Instant,
    ttl: Duration,
}

impl<T> CacheEntry<T> {
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }
}

/// In-memory result cache with per-entry TTL. Entries expire lazily on read,
/// there is no background sweep. Failed loads are cached exactly like
/// successful ones; callers invalidate with `remove` when they want a fresh
/// attempt before the TTL runs out.
pub struct MemoryCache<T> {
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
}

impl<T: Clone> Default for MemoryCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> MemoryCache<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached value for `key` if it is still fresh, otherwise run
    /// `loader`, store its result with the given TTL and return it. The TTL
    /// is measured from load completion. The lock is held across the load, so
    /// a cache hit never re-invokes the loader; a caller dropped mid-load
    /// never stores a partial entry.
    pub async fn get_or_load<F>(&self, key: &str, ttl: Duration, loader: F) -> T
    where
        F: Future<Output = T>,
    {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get(key) {
            if !entry.is_expired() {
                return entry.value.clone();
            }
        }

        let value = loader.await;
        entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.clone(),
                created_at: Instant::now(),
                ttl,
            },
        );
        value
    }

    pub async fn remove(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
