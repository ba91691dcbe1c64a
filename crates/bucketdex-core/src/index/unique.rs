use crate::{
    cache::VolatileCache,
    index::{BucketStrategy, FeatureIndex, Index, IndexError, QueryOptions},
    key::CacheNamespace,
    row::{Bucket, Row},
    store::{PersistentStore, StoreQueryOptions},
};
use std::rc::Rc;

///
/// Unique
///
/// Single-row buckets. The store is asked for two rows so that a duplicate
/// in storage fails the read instead of hiding behind the cap.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Unique;

impl BucketStrategy for Unique {
    fn capacity(&self) -> usize {
        1
    }

    fn query_options(&self) -> StoreQueryOptions {
        StoreQueryOptions::default().limit(2)
    }

    fn limit_index_size(&self, prefix: &str, rows: Bucket) -> Result<Bucket, IndexError> {
        if rows.len() > 1 {
            return Err(IndexError::UniquenessViolation {
                prefix: prefix.to_string(),
                limit: 1,
                found: rows.len(),
            });
        }

        Ok(rows)
    }
}

/// Index with at most one row per key.
pub type UniqueIndex = FeatureIndex<Unique>;

impl FeatureIndex<Unique> {
    pub fn new<I, C>(
        cache: Rc<dyn VolatileCache>,
        store: Rc<dyn PersistentStore>,
        namespace: CacheNamespace,
        indexed: I,
    ) -> Result<Self, IndexError>
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        Self::with_strategy(cache, store, namespace, indexed, Unique)
    }

    /// The single row stored under `query`, if any.
    pub fn get(&self, query: &Row) -> Result<Option<Row>, IndexError> {
        let bucket = self.find(query, &QueryOptions::default())?;

        Ok(bucket.and_then(|rows| rows.into_iter().next()))
    }
}

///
/// TESTS
///
