use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};

use lru::LruCache;
use parking_lot::Mutex;

use crate::search::results::QueryResult;

/// Result cache keyed by the full query shape plus the engine write
/// generation, so entries from before a write can never hit again and age
/// out of the LRU naturally.
pub struct QueryCache {
    cache: Mutex<LruCache<QueryKey, QueryResult>>,
    capacity: usize,
    hit_count: AtomicUsize,
    miss_count: AtomicUsize,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct QueryKey {
    pub index: String,
    pub query: String,
    pub offset: usize,
    pub limit: usize,
    pub field_mask: u8,
    /// Canonical rendering of the attached numeric filters.
    pub filters: String,
    pub generation: u64,
}

impl QueryCache {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap();
        QueryCache {
            cache: Mutex::new(LruCache::new(cap)),
            capacity: capacity.max(1),
            hit_count: AtomicUsize::new(0),
            miss_count: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, key: &QueryKey) -> Option<QueryResult> {
        let mut cache = self.cache.lock();
        if let Some(results) = cache.get(key) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            Some(results.clone())
        } else {
            self.miss_count.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    pub fn put(&self, key: QueryKey, results: QueryResult) {
        self.cache.lock().put(key, results);
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
            size: self.cache.lock().len(),
            capacity: self.capacity,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheStats {
    pub hit_count: usize,
    pub miss_count: usize,
    pub size: usize,
    pub capacity: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(query: &str, generation: u64) -> QueryKey {
        QueryKey {
            index: "idx".to_string(),
            query: query.to_string(),
            offset: 0,
            limit: 10,
            field_mask: 0xFF,
            filters: String::new(),
            generation,
        }
    }

    fn result(total: usize) -> QueryResult {
        QueryResult {
            ids: Vec::new(),
            total_results: total,
        }
    }

    #[test]
    fn test_hit_and_miss() {
        let cache = QueryCache::new(8);
        assert!(cache.get(&key("q", 0)).is_none());

        cache.put(key("q", 0), result(3));
        assert_eq!(cache.get(&key("q", 0)).unwrap().total_results, 3);

        let stats = cache.stats();
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
    }

    #[test]
    fn test_generation_invalidates() {
        let cache = QueryCache::new(8);
        cache.put(key("q", 0), result(3));
        assert!(cache.get(&key("q", 1)).is_none());
    }

    #[test]
    fn test_lru_evicts() {
        let cache = QueryCache::new(2);
        cache.put(key("a", 0), result(1));
        cache.put(key("b", 0), result(2));
        cache.put(key("c", 0), result(3));
        assert!(cache.get(&key("a", 0)).is_none());
        assert!(cache.get(&key("c", 0)).is_some());
    }
}
