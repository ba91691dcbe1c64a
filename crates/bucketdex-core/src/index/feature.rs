use crate::{
    cache::VolatileCache,
    compactor::{FeatureCompactor, RowCompactor},
    direction::SortDirection,
    index::{BucketStrategy, Index, IndexError, LifecycleHandler, QueryOptions},
    key::{BucketKey, CacheKey, CacheNamespace},
    obs::sink::{self, MetricsEvent},
    row::{Bucket, Metadata, Row},
    store::PersistentStore,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    rc::Rc,
};

///
/// FeatureIndex
///
/// Cache-backed index bucketing rows by the values of its indexed columns.
///
/// Reads go cache first, store second, and repopulate the cache from the
/// store. Writes never patch a bucket in place: the affected bucket is
/// deleted and rebuilt by the next read.
///

pub struct FeatureIndex<S> {
    cache: Rc<dyn VolatileCache>,
    store: Rc<dyn PersistentStore>,
    namespace: CacheNamespace,
    indexed: Vec<String>,
    indexed_ordered: Vec<String>,
    compactor: Box<dyn RowCompactor>,
    strategy: S,
}

impl<S: BucketStrategy> FeatureIndex<S> {
    /// Build an index over `indexed` with a full-row [`FeatureCompactor`].
    pub fn with_strategy<I, C>(
        cache: Rc<dyn VolatileCache>,
        store: Rc<dyn PersistentStore>,
        namespace: CacheNamespace,
        indexed: I,
        strategy: S,
    ) -> Result<Self, IndexError>
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        let indexed = indexed.into_iter().map(Into::into).collect::<Vec<String>>();
        if indexed.is_empty() {
            return Err(IndexError::invalid_config(
                &namespace.prefix,
                "at least one indexed column is required",
            ));
        }

        let mut indexed_ordered = indexed.clone();
        indexed_ordered.sort();
        indexed_ordered.dedup();
        if indexed_ordered.len() != indexed.len() {
            return Err(IndexError::invalid_config(
                &namespace.prefix,
                "indexed columns must be distinct",
            ));
        }

        Ok(Self {
            cache,
            store,
            compactor: Box::new(FeatureCompactor::new(&indexed)),
            namespace,
            indexed,
            indexed_ordered,
            strategy,
        })
    }

    /// Replace the row compactor.
    #[must_use]
    pub fn with_compactor(mut self, compactor: Box<dyn RowCompactor>) -> Self {
        self.compactor = compactor;
        self
    }

    #[must_use]
    pub const fn namespace(&self) -> &CacheNamespace {
        &self.namespace
    }

    #[must_use]
    pub const fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Cache key for a query naming exactly the indexed columns.
    pub fn cache_key(&self, query: &Row) -> Result<CacheKey, IndexError> {
        let bucket = BucketKey::from_query(&self.indexed_ordered, query).ok_or_else(|| {
            IndexError::UnanswerableQuery {
                prefix: self.namespace.prefix.clone(),
                columns: query.columns(),
                indexed: self.indexed_ordered.clone(),
            }
        })?;

        Ok(self.key_for(&bucket))
    }

    /// Cache key of the bucket a written row belongs to.
    pub fn row_key(&self, row: &Row) -> Result<CacheKey, IndexError> {
        let bucket = BucketKey::from_row(&self.indexed_ordered, row)
            .ok_or_else(|| IndexError::unindexable(&self.namespace.prefix, row))?;

        Ok(self.key_for(&bucket))
    }

    fn key_for(&self, bucket: &BucketKey) -> CacheKey {
        self.cache.make_key(&self.namespace, &bucket.hash())
    }

    /// Drop the bucket `row` belongs to.
    pub fn cache_purge(&self, row: &Row) -> Result<(), IndexError> {
        let key = self.row_key(row)?;
        self.invalidate(&[key]);

        Ok(())
    }

    fn invalidate(&self, keys: &[CacheKey]) {
        for key in keys {
            self.cache.delete(key);
        }

        sink::record(MetricsEvent::Invalidate {
            prefix: &self.namespace.prefix,
            keys: keys.len() as u64,
        });
    }

    // Read missing buckets from the store, cache the non-empty ones, and
    // return them in expanded form.
    fn fetch(&self, missing: &[(CacheKey, &Row)]) -> Result<BTreeMap<CacheKey, Bucket>, IndexError> {
        let mut fetched = BTreeMap::new();
        if missing.is_empty() {
            return Ok(fetched);
        }

        let queries = missing
            .iter()
            .map(|(_, query)| query.with_canonical_ids())
            .collect::<Vec<_>>();
        let found = self
            .store
            .find_multi(&queries, &self.strategy.query_options())?;

        sink::record(MetricsEvent::StoreQuery {
            prefix: &self.namespace.prefix,
            queries: queries.len() as u64,
            found: found.len() as u64,
        });

        for (position, rows) in found {
            let (key, _) = missing.get(position).ok_or_else(|| {
                IndexError::internal(format!("store answered unknown query {position}"))
            })?;

            let rows = rows.iter().map(Row::with_canonical_ids).collect();
            let rows = self.strategy.sort_index(rows);
            let rows = self.strategy.limit_index_size(&self.namespace.prefix, rows)?;
            if rows.is_empty() {
                continue;
            }

            let compact = rows
                .iter()
                .map(|row| self.compactor.compact_row(row))
                .collect::<Result<Vec<_>, _>>()?;
            self.cache.set(key, &compact);
            sink::record(MetricsEvent::CacheSet {
                prefix: &self.namespace.prefix,
            });

            fetched.insert(key.clone(), rows);
        }

        Ok(fetched)
    }
}

// Distinct keys in first-seen order.
fn distinct(keys: &[CacheKey]) -> Vec<CacheKey> {
    let mut seen = BTreeSet::new();

    keys.iter()
        .filter(|key| seen.insert((*key).clone()))
        .cloned()
        .collect()
}

impl<S: BucketStrategy> Index for FeatureIndex<S> {
    fn prefix(&self) -> &str {
        &self.namespace.prefix
    }

    fn indexed_columns(&self) -> &[String] {
        &self.indexed
    }

    fn limit(&self) -> usize {
        self.strategy.capacity()
    }

    fn ordering(&self) -> Option<(&[String], SortDirection)> {
        self.strategy.sort()
    }

    fn can_answer(&self, columns: &[&str], options: &QueryOptions) -> bool {
        let mut wanted = columns.to_vec();
        wanted.sort_unstable();
        wanted.dedup();

        let same_columns = wanted.len() == columns.len()
            && wanted.iter().copied().eq(self.indexed_ordered.iter().map(String::as_str));

        same_columns
            && options
                .reach()
                .is_none_or(|reach| reach <= self.strategy.capacity())
            && self.strategy.can_answer(options)
    }

    fn find_multi(
        &self,
        queries: &[Row],
        options: &QueryOptions,
    ) -> Result<BTreeMap<usize, Bucket>, IndexError> {
        let keys = queries
            .iter()
            .map(|query| self.cache_key(query))
            .collect::<Result<Vec<_>, _>>()?;
        let distinct = distinct(&keys);

        let cached = self.cache.get_multi(&distinct);

        // one store query per missing key, however many queries share it
        let missing = distinct
            .iter()
            .filter(|key| !cached.contains_key(*key))
            .filter_map(|key| {
                let position = keys.iter().position(|k| k == key)?;
                Some((key.clone(), &queries[position]))
            })
            .collect::<Vec<_>>();

        sink::record(MetricsEvent::CacheLookup {
            prefix: &self.namespace.prefix,
            hits: cached.len() as u64,
            misses: missing.len() as u64,
        });

        let fetched = self.fetch(&missing)?;

        let mut results = BTreeMap::new();
        let mut from_cache = Vec::new();
        for (position, key) in keys.iter().enumerate() {
            if let Some(rows) = cached.get(key) {
                results.insert(position, rows.clone());
                from_cache.push(position);
            } else if let Some(rows) = fetched.get(key) {
                results.insert(position, rows.clone());
            }
        }

        let mut results =
            self.strategy
                .filter_results(&self.namespace.prefix, results, options)?;

        // only cache-sourced rows are compacted
        let compacted = from_cache
            .into_iter()
            .filter_map(|position| results.remove(&position).map(|rows| (position, rows)))
            .collect::<BTreeMap<_, _>>();
        if !compacted.is_empty() {
            let contexts = compacted
                .keys()
                .map(|&position| (position, queries[position].clone()))
                .collect::<BTreeMap<_, _>>();
            let sizes = compacted
                .iter()
                .map(|(&position, rows)| (position, rows.len()))
                .collect::<BTreeMap<_, _>>();
            let expanded = self.compactor.expand_cache_result(compacted, &contexts)?;

            // a bucket that lost rows on expansion no longer mirrors the store
            let stale = expanded
                .iter()
                .filter(|&(position, rows)| sizes.get(position).is_some_and(|&n| rows.len() < n))
                .map(|(&position, _)| keys[position].clone())
                .collect::<Vec<_>>();
            if !stale.is_empty() {
                self.invalidate(&self::distinct(&stale));
            }

            results.extend(expanded);
        }

        results.retain(|_, rows| !rows.is_empty());

        Ok(results)
    }

    fn found_multi(&self, queries: &[Row]) -> Result<bool, IndexError> {
        let keys = queries
            .iter()
            .map(|query| self.cache_key(query))
            .collect::<Result<Vec<_>, _>>()?;
        let distinct = distinct(&keys);

        if !distinct
            .iter()
            .all(|key| self.cache.has(key) == Some(true))
        {
            return Ok(false);
        }

        if !self.compactor.defers_expansion() {
            return Ok(true);
        }

        let cached = self.cache.get_multi(&distinct);
        if cached.len() != distinct.len() {
            return Ok(false);
        }

        let by_position = cached.into_values().enumerate().collect();
        self.compactor.expanded_found(&by_position)
    }
}

impl<S, O> LifecycleHandler<O> for FeatureIndex<S>
where
    S: BucketStrategy,
    O: ?Sized,
{
    fn on_after_insert(&self, _: &O, new_row: &Row, _: &Metadata) -> Result<(), IndexError> {
        let key = self.row_key(new_row)?;
        self.invalidate(&[key]);

        Ok(())
    }

    fn on_after_update(
        &self,
        _: &O,
        old_row: &Row,
        new_row: &Row,
        _: &Metadata,
    ) -> Result<(), IndexError> {
        let old_key = self.row_key(old_row)?;
        let new_key = self.row_key(new_row)?;

        if old_key == new_key {
            if self.compactor.compact_row(old_row)? == self.compactor.compact_row(new_row)? {
                return Ok(());
            }
            self.invalidate(&[old_key]);
        } else {
            // the row moved buckets
            self.invalidate(&[old_key, new_key]);
        }

        Ok(())
    }

    fn on_after_remove(&self, _: &O, old_row: &Row, _: &Metadata) -> Result<(), IndexError> {
        let key = self.row_key(old_row)?;
        self.invalidate(&[key]);

        Ok(())
    }
}
