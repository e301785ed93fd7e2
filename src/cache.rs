// src/cache.rs

//! TTL-keyed cache of search result pages.
//!
//! Keyed by `(normalized query, offset)` so every page is cached
//! independently. Eviction is lazy on read plus a periodic sweep; a
//! capacity cap bounds memory even if the sweep falls behind.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::models::SearchPage;

type CacheKey = (String, u64);

struct CacheEntry {
    page: SearchPage,
    expires_at: Instant,
}

/// Shared result-page cache, read-heavy.
pub struct QueryCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl QueryCache {
    /// Create a cache with the given entry TTL and capacity cap.
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries,
        }
    }

    /// Fetch a cached page. An expired entry counts as absent.
    pub fn get(&self, query: &str, offset: u64) -> Option<SearchPage> {
        let entries = read(&self.entries);
        let entry = entries.get(&(query.to_string(), offset))?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(entry.page.clone())
    }

    /// Store a page under `(query, offset)` with the configured TTL.
    pub fn insert(&self, query: &str, offset: u64, page: SearchPage) {
        let mut entries = write(&self.entries);

        if entries.len() >= self.max_entries {
            // Drop the entry closest to expiry to make room.
            if let Some(key) = entries
                .iter()
                .min_by_key(|(_, e)| e.expires_at)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&key);
            }
        }

        entries.insert(
            (query.to_string(), offset),
            CacheEntry {
                page,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Drop everything, e.g. after a catalog write burst.
    pub fn invalidate_all(&self) {
        write(&self.entries).clear();
    }

    /// Remove expired entries; returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = write(&self.entries);
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        before - entries.len()
    }

    /// Number of live and expired-but-unswept entries.
    pub fn len(&self) -> usize {
        read(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawn the background sweep task.
    pub fn spawn_sweeper(self: Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        let cache = self;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let dropped = cache.sweep();
                if dropped > 0 {
                    log::debug!("cache sweep dropped {dropped} expired entries");
                }
            }
        })
    }
}

fn read<'a, K, V>(lock: &'a RwLock<HashMap<K, V>>) -> std::sync::RwLockReadGuard<'a, HashMap<K, V>> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<'a, K, V>(
    lock: &'a RwLock<HashMap<K, V>>,
) -> std::sync::RwLockWriteGuard<'a, HashMap<K, V>> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_with_total(total: u64) -> SearchPage {
        SearchPage {
            records: Vec::new(),
            next_offset: None,
            total,
        }
    }

    #[test]
    fn test_get_miss_then_hit() {
        let cache = QueryCache::new(Duration::from_secs(60), 16);
        assert!(cache.get("alpha", 0).is_none());

        cache.insert("alpha", 0, page_with_total(2));
        assert_eq!(cache.get("alpha", 0).unwrap().total, 2);
        // a different offset is a different key
        assert!(cache.get("alpha", 10).is_none());
    }

    #[test]
    fn test_expired_entry_counts_as_absent() {
        let cache = QueryCache::new(Duration::from_millis(10), 16);
        cache.insert("alpha", 0, page_with_total(1));

        std::thread::sleep(Duration::from_millis(25));
        assert!(cache.get("alpha", 0).is_none());
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let cache = QueryCache::new(Duration::from_millis(10), 16);
        cache.insert("old", 0, page_with_total(1));
        std::thread::sleep(Duration::from_millis(25));

        cache.insert("new", 0, page_with_total(2));
        // "new" shares the 10ms TTL but was just inserted
        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("new", 0).is_some());
    }

    #[test]
    fn test_capacity_cap_evicts() {
        let cache = QueryCache::new(Duration::from_secs(60), 2);
        cache.insert("a", 0, page_with_total(1));
        cache.insert("b", 0, page_with_total(2));
        cache.insert("c", 0, page_with_total(3));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("c", 0).is_some());
    }

    #[tokio::test]
    async fn test_background_sweeper_drains_expired() {
        let cache = Arc::new(QueryCache::new(Duration::from_millis(5), 16));
        cache.insert("a", 0, page_with_total(1));

        let sweeper = Arc::clone(&cache).spawn_sweeper(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(cache.is_empty());
        sweeper.abort();
    }

    #[test]
    fn test_invalidate_all() {
        let cache = QueryCache::new(Duration::from_secs(60), 16);
        cache.insert("a", 0, page_with_total(1));
        cache.insert("b", 0, page_with_total(2));

        cache.invalidate_all();
        assert!(cache.is_empty());
    }
}
