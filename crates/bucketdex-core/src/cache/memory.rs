use crate::{
    cache::VolatileCache,
    key::CacheKey,
    obs::sink::{self, MetricsEvent},
    row::{Bucket, Row},
};
use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
};

///
/// CacheStats
/// Operation counters for one `MemoryCache`.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CacheStats {
    pub gets: u64,
    pub hits: u64,
    pub sets: u64,
    pub deletes: u64,
}

///
/// MemoryCache
///
/// In-process volatile cache. Buckets are held JSON-encoded, the way a
/// networked cache would hold them, so every read decodes a fresh copy.
///

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RefCell<BTreeMap<CacheKey, Vec<u8>>>,
    stats: Cell<CacheStats>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats.get()
    }

    /// Drop every entry and reset the counters.
    pub fn flush(&self) {
        self.entries.borrow_mut().clear();
        self.stats.set(CacheStats::default());
    }

    /// Overwrite the raw bytes held under `key`.
    pub fn set_raw(&self, key: &CacheKey, bytes: Vec<u8>) {
        self.entries.borrow_mut().insert(key.clone(), bytes);
    }

    fn bump(&self, f: impl FnOnce(&mut CacheStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }
}

impl VolatileCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<Bucket> {
        self.bump(|s| s.gets += 1);

        let decoded = {
            let entries = self.entries.borrow();
            let bytes = entries.get(key)?;
            serde_json::from_slice::<Bucket>(bytes)
        };

        match decoded {
            Ok(bucket) => {
                self.bump(|s| s.hits += 1);
                Some(bucket)
            }
            Err(_) => {
                // corrupt entries are treated as absent and dropped
                self.entries.borrow_mut().remove(key);
                sink::record(MetricsEvent::DecodeFailure { key: key.as_str() });
                None
            }
        }
    }

    fn set(&self, key: &CacheKey, bucket: &[Row]) {
        match serde_json::to_vec(bucket) {
            Ok(bytes) => {
                self.bump(|s| s.sets += 1);
                self.set_raw(key, bytes);
            }
            Err(_) => {
                // an entry that cannot be written must not outlive the write
                self.entries.borrow_mut().remove(key);
            }
        }
    }

    fn delete(&self, key: &CacheKey) {
        self.bump(|s| s.deletes += 1);
        self.entries.borrow_mut().remove(key);
    }

    fn has(&self, key: &CacheKey) -> Option<bool> {
        Some(self.entries.borrow().contains_key(key))
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cache::NullCache,
        key::{CacheNamespace, make_cache_key},
        obs::{metrics_report, metrics_reset_all},
    };

    fn key(hash: &str) -> CacheKey {
        make_cache_key(&CacheNamespace::new("test", "db", 1), hash)
    }

    #[test]
    fn set_then_get_returns_an_equal_bucket() {
        let cache = MemoryCache::new();
        let bucket = vec![Row::new().with("created", 4), Row::new().with("created", 3)];

        cache.set(&key("a"), &bucket);

        assert_eq!(cache.get(&key("a")), Some(bucket));
        assert_eq!(cache.has(&key("a")), Some(true));
        assert_eq!(cache.has(&key("b")), Some(false));
    }

    #[test]
    fn get_multi_omits_misses() {
        let cache = MemoryCache::new();
        cache.set(&key("a"), &[Row::new().with("n", 1)]);

        let found = cache.get_multi(&[key("a"), key("b")]);

        assert_eq!(found.len(), 1);
        assert!(found.contains_key(&key("a")));
        assert_eq!(cache.stats().gets, 2);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn undecodable_entry_is_a_miss_and_is_dropped() {
        metrics_reset_all();
        let cache = MemoryCache::new();
        cache.set_raw(&key("a"), b"not json".to_vec());

        assert!(cache.get(&key("a")).is_none());
        assert_eq!(cache.has(&key("a")), Some(false));
        assert_eq!(metrics_report().ops.decode_failures, 1);
    }

    #[test]
    fn delete_removes_the_entry() {
        let cache = MemoryCache::new();
        cache.set(&key("a"), &[]);
        cache.delete(&key("a"));

        assert!(cache.is_empty());
        assert_eq!(cache.stats().deletes, 1);
    }

    #[test]
    fn null_cache_never_hits_and_has_no_membership_check() {
        let cache = NullCache;
        cache.set(&key("a"), &[Row::new().with("n", 1)]);

        assert!(cache.get(&key("a")).is_none());
        assert!(cache.has(&key("a")).is_none());
    }
}
