//! Volatile cache contract.
//!
//! The cache is never authoritative: a miss, an undecodable entry, or an
//! outright outage all mean "go ask the store".

mod memory;

pub use memory::{CacheStats, MemoryCache};

use crate::{
    key::{CacheKey, CacheNamespace, make_cache_key},
    row::{Bucket, Row},
};
use std::collections::BTreeMap;

///
/// VolatileCache
///
/// Opaque key → bucket store shared by every index instance. Calls are
/// synchronous; implementations own expiry and eviction.
///

pub trait VolatileCache {
    fn get(&self, key: &CacheKey) -> Option<Bucket>;

    /// Batch fetch; misses are omitted from the result.
    fn get_multi(&self, keys: &[CacheKey]) -> BTreeMap<CacheKey, Bucket> {
        keys.iter()
            .filter_map(|key| self.get(key).map(|bucket| (key.clone(), bucket)))
            .collect()
    }

    fn set(&self, key: &CacheKey, bucket: &[Row]);

    fn delete(&self, key: &CacheKey);

    /// Membership check, when the backend supports one.
    fn has(&self, _key: &CacheKey) -> Option<bool> {
        None
    }

    fn make_key(&self, namespace: &CacheNamespace, hash: &str) -> CacheKey {
        make_cache_key(namespace, hash)
    }
}

///
/// NullCache
/// Cache that never holds anything; every read goes to the store.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct NullCache;

impl VolatileCache for NullCache {
    fn get(&self, _key: &CacheKey) -> Option<Bucket> {
        None
    }

    fn set(&self, _key: &CacheKey, _bucket: &[Row]) {}

    fn delete(&self, _key: &CacheKey) {}
}
