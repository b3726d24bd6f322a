// Query cache for fetched collections
// Sits between catalog pages and the backend; a successful submission invalidates
// the collections it touched so the next read re-fetches.

use bytes::Bytes;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::CacheConfig;

#[derive(Debug, Default)]
pub struct CacheStats {
    pub size_bytes: AtomicUsize,
    pub items_count: AtomicUsize,
    pub hit_count: AtomicUsize,
    pub miss_count: AtomicUsize,
    pub eviction_count: AtomicUsize,
    pub expired_count: AtomicUsize,
    pub invalidated_count: AtomicUsize,
    pub rejected_count: AtomicUsize,
    pub total_lookups: AtomicU64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStatsReport {
    pub size_bytes: usize,
    pub items_count: usize,
    pub hit_count: usize,
    pub miss_count: usize,
    pub eviction_count: usize,
    pub expired_count: usize,
    pub invalidated_count: usize,
    pub rejected_count: usize,
    pub total_lookups: u64,
}

pub trait QueryCache: Send + Sync + 'static {
    // Fresh data for the key, if any
    fn get(&self, key: &str) -> Option<Bytes>;

    // TTL of None uses the configured default.
    // Returns false if the entry can never fit.
    fn store(&self, key: &str, data: Bytes, ttl: Option<Duration>) -> bool;

    // Marks `key` and every `key:*` sub-key stale. Returns the number of entries dropped.
    fn invalidate(&self, key: &str) -> usize;

    fn stats(&self) -> CacheStatsReport;
}

pub fn calculate_item_size(key: &str, data: &[u8]) -> usize {
    key.len() + data.len() + std::mem::size_of::<CacheEntry>()
}

// "tours" matches "tours" and "tours:luxury", not "tours-archive"
pub fn key_matches(key: &str, prefix: &str) -> bool {
    key == prefix
        || key
            .strip_prefix(prefix)
            .map_or(false, |rest| rest.starts_with(':'))
}

struct CacheEntry {
    data: Bytes,
    created_at: Instant,
    ttl: Duration,
    last_accessed: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }
}

pub struct InMemoryQueryCache {
    entries: DashMap<String, CacheEntry>,
    config: CacheConfig,
    stats: CacheStats,
}

impl InMemoryQueryCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            stats: CacheStats::default(),
        }
    }

    fn max_size_bytes(&self) -> usize {
        self.config.max_size_mb * 1024 * 1024
    }

    fn remove_entry(&self, key: &str) -> bool {
        if let Some((key, removed)) = self.entries.remove(key) {
            self.stats
                .size_bytes
                .fetch_sub(calculate_item_size(&key, &removed.data), Ordering::SeqCst);
            self.stats.items_count.fetch_sub(1, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    fn evict_least_recently_used(&self) -> bool {
        let oldest_key = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().last_accessed)
            .map(|entry| entry.key().clone());

        match oldest_key {
            Some(key) => {
                debug!(key = %key, "evicting least recently used entry");
                let removed = self.remove_entry(&key);
                if removed {
                    self.stats.eviction_count.fetch_add(1, Ordering::SeqCst);
                }
                removed
            }
            None => false,
        }
    }
}

impl Default for InMemoryQueryCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl QueryCache for InMemoryQueryCache {
    fn get(&self, key: &str) -> Option<Bytes> {
        self.stats.total_lookups.fetch_add(1, Ordering::SeqCst);

        let expired = match self.entries.get_mut(key) {
            Some(mut entry) => {
                if entry.is_expired() {
                    true
                } else {
                    entry.last_accessed = Instant::now();
                    self.stats.hit_count.fetch_add(1, Ordering::SeqCst);
                    debug!(key, "cache hit");
                    return Some(entry.data.clone());
                }
            }
            None => false,
        };

        // The shard guard is released before removal
        if expired && self.remove_entry(key) {
            self.stats.expired_count.fetch_add(1, Ordering::SeqCst);
        }
        self.stats.miss_count.fetch_add(1, Ordering::SeqCst);
        debug!(key, expired, "cache miss");
        None
    }

    fn store(&self, key: &str, data: Bytes, ttl: Option<Duration>) -> bool {
        let item_size = calculate_item_size(key, &data);
        let max_size_bytes = self.max_size_bytes();

        if item_size > max_size_bytes {
            self.stats.rejected_count.fetch_add(1, Ordering::SeqCst);
            debug!(key, item_size, max_size_bytes, "entry larger than cache, rejected");
            return false;
        }

        // Replacing an entry frees its old footprint first
        self.remove_entry(key);

        while self.stats.size_bytes.load(Ordering::SeqCst) + item_size > max_size_bytes {
            if !self.evict_least_recently_used() {
                break;
            }
        }

        let ttl = ttl.unwrap_or_else(|| Duration::from_secs(self.config.default_ttl_seconds));
        let now = Instant::now();
        self.stats.items_count.fetch_add(1, Ordering::SeqCst);
        self.stats.size_bytes.fetch_add(item_size, Ordering::SeqCst);
        let replaced = self.entries.insert(
            key.to_string(),
            CacheEntry {
                data,
                created_at: now,
                ttl,
                last_accessed: now,
            },
        );
        // A concurrent store may have slipped in between removal and insert
        if let Some(old) = replaced {
            self.stats
                .size_bytes
                .fetch_sub(calculate_item_size(key, &old.data), Ordering::SeqCst);
            self.stats.items_count.fetch_sub(1, Ordering::SeqCst);
        }
        debug!(key, item_size, ?ttl, "cache store");

        true
    }

    fn invalidate(&self, key: &str) -> usize {
        let keys_to_remove: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| key_matches(entry.key(), key))
            .map(|entry| entry.key().clone())
            .collect();

        let count = keys_to_remove
            .iter()
            .filter(|k| self.remove_entry(k))
            .count();
        self.stats
            .invalidated_count
            .fetch_add(count, Ordering::SeqCst);
        debug!(key, count, "cache invalidate");
        count
    }

    fn stats(&self) -> CacheStatsReport {
        CacheStatsReport {
            size_bytes: self.stats.size_bytes.load(Ordering::SeqCst),
            items_count: self.stats.items_count.load(Ordering::SeqCst),
            hit_count: self.stats.hit_count.load(Ordering::SeqCst),
            miss_count: self.stats.miss_count.load(Ordering::SeqCst),
            eviction_count: self.stats.eviction_count.load(Ordering::SeqCst),
            expired_count: self.stats.expired_count.load(Ordering::SeqCst),
            invalidated_count: self.stats.invalidated_count.load(Ordering::SeqCst),
            rejected_count: self.stats.rejected_count.load(Ordering::SeqCst),
            total_lookups: self.stats.total_lookups.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn small_config(max_size_mb: usize, default_ttl_seconds: u64) -> CacheConfig {
        CacheConfig {
            max_size_mb,
            default_ttl_seconds,
        }
    }

    #[test]
    fn test_store_and_get() {
        let cache = InMemoryQueryCache::default();
        assert!(cache.get("tours").is_none());

        assert!(cache.store("tours", Bytes::from_static(b"[]"), None));
        assert_eq!(cache.get("tours"), Some(Bytes::from_static(b"[]")));

        let stats = cache.stats();
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.items_count, 1);
        assert_eq!(stats.total_lookups, 2);
    }

    #[test]
    fn test_expiration_and_ttl() {
        let cache = InMemoryQueryCache::new(small_config(5, 300));

        assert!(cache.store("hotels", Bytes::from_static(b"[1]"), None));
        assert!(cache.store(
            "festivals",
            Bytes::from_static(b"[2]"),
            Some(Duration::from_millis(50))
        ));

        thread::sleep(Duration::from_millis(120));

        assert!(cache.get("hotels").is_some());
        assert!(cache.get("festivals").is_none());

        let stats = cache.stats();
        assert_eq!(stats.expired_count, 1);
        assert_eq!(stats.items_count, 1);
    }

    #[test]
    fn test_invalidate_matches_sub_keys_only() {
        let cache = InMemoryQueryCache::default();
        cache.store("tours", Bytes::from_static(b"a"), None);
        cache.store("tours:luxury", Bytes::from_static(b"b"), None);
        cache.store("tours-archive", Bytes::from_static(b"c"), None);
        cache.store("hotels", Bytes::from_static(b"d"), None);

        assert_eq!(cache.invalidate("tours"), 2);
        assert!(cache.get("tours").is_none());
        assert!(cache.get("tours:luxury").is_none());
        assert!(cache.get("tours-archive").is_some());
        assert!(cache.get("hotels").is_some());

        assert_eq!(cache.invalidate("bookings"), 0);
        assert_eq!(cache.stats().invalidated_count, 2);
    }

    #[test]
    fn test_eviction_lru() {
        let cache = InMemoryQueryCache::new(small_config(1, 3600));
        let large = Bytes::from(vec![0u8; 250 * 1024]);

        for i in 0..4 {
            assert!(cache.store(&format!("tours:{}", i), large.clone(), None));
            thread::sleep(Duration::from_millis(2));
        }

        // Touch 0 and 2 so 1 becomes the least recently used
        assert!(cache.get("tours:0").is_some());
        thread::sleep(Duration::from_millis(2));
        assert!(cache.get("tours:2").is_some());

        assert!(cache.store("tours:4", large.clone(), None));

        assert!(cache.get("tours:0").is_some());
        assert!(cache.get("tours:2").is_some());
        assert!(cache.get("tours:4").is_some());
        assert!(cache.get("tours:1").is_none());

        let stats = cache.stats();
        assert!(stats.eviction_count > 0, "Expected evictions to occur");
        assert!(stats.size_bytes <= 1024 * 1024);
    }

    #[test]
    fn test_oversized_entry_is_rejected() {
        let cache = InMemoryQueryCache::new(small_config(1, 60));
        let huge = Bytes::from(vec![0u8; 2 * 1024 * 1024]);

        assert!(!cache.store("tours", huge, None));
        assert_eq!(cache.stats().rejected_count, 1);
        assert_eq!(cache.stats().items_count, 0);
    }

    #[test]
    fn test_replacing_entry_keeps_size_accounting() {
        let cache = InMemoryQueryCache::default();
        cache.store("hotels", Bytes::from_static(b"first"), None);
        let after_first = cache.stats().size_bytes;
        cache.store("hotels", Bytes::from_static(b"other"), None);

        let stats = cache.stats();
        assert_eq!(stats.items_count, 1);
        assert_eq!(stats.size_bytes, after_first);
        assert_eq!(cache.get("hotels"), Some(Bytes::from_static(b"other")));
    }

    #[test]
    fn test_concurrent_reads_and_invalidations() {
        let cache = Arc::new(InMemoryQueryCache::default());
        let mut handles = vec![];

        for i in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for j in 0..200 {
                    let key = format!("tours:{}", j % 5);
                    match j % 10 {
                        0 => {
                            cache.invalidate("tours");
                        }
                        1..=3 => {
                            cache.store(&key, Bytes::from(vec![i as u8; 16]), None);
                        }
                        _ => {
                            let _ = cache.get(&key);
                        }
                    }
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        cache.invalidate("tours");
        let stats = cache.stats();
        assert_eq!(stats.items_count, 0);
        assert_eq!(stats.size_bytes, 0);
    }
}
