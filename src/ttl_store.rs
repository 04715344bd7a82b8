//! Expiring key-value storage
//!
//! This module provides the generic building block under the per-event
//! resource cache: a mapping from keys to values where every entry carries
//! its own expiration timer.
//!
//! ## How It Works
//!
//! 1. **Write**: `set` stores the value and schedules one deferred eviction
//!    task for the entry (`tokio::time::sleep`)
//! 2. **Overwrite**: a later `set` for the same key aborts the previous
//!    timer and schedules a fresh one — timers never stack
//! 3. **Read**: `get`/`has` consult the entry's deadline, so a value is
//!    never observable past its lifetime even in the instant before its
//!    timer task runs
//! 4. **Delete**: removes the entry and cancels its pending timer
//!
//! There is no background sweep; eviction is purely timer-driven, one task
//! per live entry. Values are cloned out on read, so mutating a returned
//! value can never corrupt the stored copy.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

struct Entry<V> {
    value: V,
    expires_at: Instant,
    /// Stamp of the write that produced this entry. An eviction timer only
    /// removes the entry when the stamp still matches, so a timer belonging
    /// to an overwritten value can never evict its replacement.
    generation: u64,
    timer: JoinHandle<()>,
}

struct StoreInner<K, V> {
    default_lifetime: Duration,
    generation: AtomicU64,
    entries: RwLock<HashMap<K, Entry<V>>>,
}

/// Key-value store with per-entry time-based eviction
///
/// Cloning the store is cheap and yields a handle to the same underlying
/// entries. All operations are infallible; `set` must be called from within
/// a Tokio runtime because it spawns the entry's eviction timer.
pub struct TtlStore<K, V> {
    inner: Arc<StoreInner<K, V>>,
}

impl<K, V> Clone for TtlStore<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> std::fmt::Debug for TtlStore<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlStore")
            .field("default_lifetime", &self.inner.default_lifetime)
            .field("entries", &self.inner.entries.read().len())
            .finish()
    }
}

impl<K, V> TtlStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a store whose entries expire after `default_lifetime` unless
    /// a per-entry lifetime is given at write time
    pub fn new(default_lifetime: Duration) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                default_lifetime,
                generation: AtomicU64::new(0),
                entries: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// True iff an unexpired entry exists for `key`
    pub fn has(&self, key: &K) -> bool {
        let entries = self.inner.entries.read();
        entries
            .get(key)
            .map(|e| e.expires_at > Instant::now())
            .unwrap_or(false)
    }

    /// Return a clone of the live value for `key`, if any
    pub fn get(&self, key: &K) -> Option<V> {
        let entries = self.inner.entries.read();
        entries
            .get(key)
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| e.value.clone())
    }

    /// Return the live value for `key`, or `fallback` if absent or expired
    pub fn get_or(&self, key: &K, fallback: V) -> V {
        self.get(key).unwrap_or(fallback)
    }

    /// Insert or overwrite the entry under the store-wide default lifetime
    pub fn set(&self, key: K, value: V) {
        self.set_with_lifetime(key, value, self.inner.default_lifetime);
    }

    /// Insert or overwrite the entry, resetting its expiration to
    /// now + `lifetime`
    ///
    /// Overwriting an existing key cancels and replaces its prior timer.
    pub fn set_with_lifetime(&self, key: K, value: V, lifetime: Duration) {
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);
        let expires_at = Instant::now() + lifetime;

        let inner = Arc::clone(&self.inner);
        let timer_key = key.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(lifetime).await;
            let mut entries = inner.entries.write();
            // Only evict the write this timer was armed for
            if entries.get(&timer_key).map(|e| e.generation) == Some(generation) {
                entries.remove(&timer_key);
            }
        });

        let mut entries = self.inner.entries.write();
        if let Some(old) = entries.insert(
            key,
            Entry {
                value,
                expires_at,
                generation,
                timer,
            },
        ) {
            old.timer.abort();
        }
    }

    /// Remove the entry immediately and cancel its pending timer
    ///
    /// Deleting an absent key is a no-op. Returns whether an entry was
    /// removed.
    pub fn delete(&self, key: &K) -> bool {
        let mut entries = self.inner.entries.write();
        match entries.remove(key) {
            Some(entry) => {
                entry.timer.abort();
                true
            }
            None => false,
        }
    }

    /// Number of entries currently held (expired-but-unswept entries do not
    /// count)
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.inner.entries.read();
        entries.values().filter(|e| e.expires_at > now).count()
    }

    /// True when no live entry is held
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all entries and cancel their timers
    pub fn clear(&self) {
        let mut entries = self.inner.entries.write();
        for (_, entry) in entries.drain() {
            entry.timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    fn store(lifetime_ms: u64) -> TtlStore<String, i32> {
        TtlStore::new(Duration::from_millis(lifetime_ms))
    }

    #[tokio::test(start_paused = true)]
    async fn set_then_get_roundtrip() {
        let cache = store(100);
        cache.set("x".to_string(), 1);

        assert!(cache.has(&"x".to_string()));
        assert_eq!(cache.get(&"x".to_string()), Some(1));
        assert_eq!(cache.get_or(&"x".to_string(), 0), 1);
        assert_eq!(cache.get(&"absent".to_string()), None);
        assert_eq!(cache.get_or(&"absent".to_string(), 7), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn entry_expires_after_lifetime() {
        let cache = store(100);
        cache.set("x".to_string(), 1);

        advance(Duration::from_millis(99)).await;
        assert_eq!(cache.get(&"x".to_string()), Some(1));

        advance(Duration::from_millis(2)).await;
        assert!(!cache.has(&"x".to_string()));
        assert_eq!(cache.get(&"x".to_string()), None);
        assert_eq!(cache.get_or(&"x".to_string(), 0), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn overwrite_resets_expiration() {
        // set at t=0, overwrite at t=50, lifetime 100: the entry must
        // survive t=120 and be gone by t=160
        let cache = store(100);
        cache.set("x".to_string(), 1);

        advance(Duration::from_millis(50)).await;
        cache.set("x".to_string(), 2);

        advance(Duration::from_millis(70)).await; // t=120
        assert_eq!(cache.get(&"x".to_string()), Some(2));

        advance(Duration::from_millis(40)).await; // t=160
        assert_eq!(cache.get(&"x".to_string()), None);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_removes_immediately() {
        let cache = store(100);
        cache.set("x".to_string(), 1);

        assert!(cache.delete(&"x".to_string()));
        assert_eq!(cache.get(&"x".to_string()), None);

        // Deleting an absent key is a no-op
        assert!(!cache.delete(&"x".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn no_dangling_timer_after_delete() {
        // A reused key must not be evicted by the deleted entry's timer
        let cache = store(100);
        cache.set("x".to_string(), 1);

        advance(Duration::from_millis(10)).await;
        cache.delete(&"x".to_string());
        cache.set_with_lifetime("x".to_string(), 2, Duration::from_millis(300));

        advance(Duration::from_millis(140)).await; // past the first entry's deadline
        assert_eq!(cache.get(&"x".to_string()), Some(2));

        advance(Duration::from_millis(200)).await;
        assert_eq!(cache.get(&"x".to_string()), None);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_timer_does_not_evict_replacement() {
        // Same shape as no_dangling_timer_after_delete but via overwrite:
        // the superseded timer must not fire against the new value
        let cache = store(100);
        cache.set("x".to_string(), 1);
        cache.set_with_lifetime("x".to_string(), 2, Duration::from_millis(500));

        advance(Duration::from_millis(150)).await;
        assert_eq!(cache.get(&"x".to_string()), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_lifetime_overrides_default() {
        let cache = store(100);
        cache.set_with_lifetime("short".to_string(), 1, Duration::from_millis(20));
        cache.set("long".to_string(), 2);

        advance(Duration::from_millis(50)).await;
        assert_eq!(cache.get(&"short".to_string()), None);
        assert_eq!(cache.get(&"long".to_string()), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn eviction_task_removes_entry_from_map() {
        let cache = store(50);
        cache.set("x".to_string(), 1);
        assert_eq!(cache.len(), 1);

        advance(Duration::from_millis(60)).await;
        // Give the spawned eviction task a chance to run
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }

        assert!(cache.is_empty());
        assert!(cache.inner.entries.read().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn clear_drops_everything() {
        let cache = store(100);
        cache.set("a".to_string(), 1);
        cache.set("b".to_string(), 2);
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&"a".to_string()), None);
    }

    #[tokio::test(start_paused = true)]
    async fn clones_share_entries() {
        let cache = store(100);
        let handle = cache.clone();
        cache.set("x".to_string(), 1);
        assert_eq!(handle.get(&"x".to_string()), Some(1));
    }
}
