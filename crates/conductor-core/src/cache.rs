//! Task result cache
//!
//! Keyed memoization of `(task, agent)` -> output with TTL-based eviction.
//! Shared process-wide via `Arc`; concurrent misses both compute and the
//! second write wins (no single-flight coalescing).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

/// Deterministic cache key for a task/agent pair.
///
/// Equal `(task, agent)` pairs must produce equal keys; the separator keeps
/// `("ab", "c")` and `("a", "bc")` distinct.
pub fn task_key(task: &str, agent_name: &str) -> String {
    format!("{}\u{1f}{}", agent_name, task)
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    inserted_at: Instant,
}

/// Bounded-lifetime task output cache.
pub struct TaskCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    enabled: bool,
}

impl TaskCache {
    /// Create a cache with the given TTL
    pub fn new(enabled: bool, ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            enabled,
        }
    }

    /// A cache that never hits and never stores
    pub fn disabled() -> Self {
        Self::new(false, Duration::ZERO)
    }

    /// Whether the executor should consult this cache at all
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Return the value for `key` if it is still fresh.
    ///
    /// A stale hit is removed on the way out.
    pub async fn get(&self, key: &str) -> Option<String> {
        let stale = {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return None,
                Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                    return Some(entry.value.clone());
                }
                Some(_) => true,
            }
        };

        if stale {
            let mut entries = self.entries.write().await;
            // re-check: another caller may have refreshed the entry
            if let Some(entry) = entries.get(key) {
                if entry.inserted_at.elapsed() >= self.ttl {
                    entries.remove(key);
                }
            }
        }
        None
    }

    /// Insert or overwrite the value for `key`
    pub async fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.into(),
            CacheEntry {
                value: value.into(),
                inserted_at: Instant::now(),
            },
        );
    }

    /// Number of live entries (stale entries linger until probed)
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache currently holds no entries
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
