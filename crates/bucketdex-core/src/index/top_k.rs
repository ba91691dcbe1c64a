use crate::{
    DEFAULT_TOP_K_LIMIT,
    cache::VolatileCache,
    compactor::ShallowCompactor,
    direction::SortDirection,
    index::{
        BucketStrategy, FeatureIndex, IndexError, QueryOptions, UniqueIndex,
        options::{OffsetDir, join_cursor},
        page,
    },
    key::CacheNamespace,
    row::{Bucket, Row},
    store::{PersistentStore, StoreQueryOptions},
};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, collections::BTreeMap, rc::Rc};

///
/// TopKOptions
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TopKOptions {
    pub sort: Vec<String>,
    #[serde(default)]
    pub order: SortDirection,
    #[serde(default = "TopKOptions::default_limit")]
    pub limit: usize,
}

impl TopKOptions {
    #[must_use]
    pub fn new<I, S>(sort: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sort: sort.into_iter().map(Into::into).collect(),
            order: SortDirection::default(),
            limit: DEFAULT_TOP_K_LIMIT,
        }
    }

    #[must_use]
    pub const fn order(mut self, order: SortDirection) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    const fn default_limit() -> usize {
        DEFAULT_TOP_K_LIMIT
    }
}

///
/// TopK
///
/// Buckets hold the `limit` highest-priority rows under the sort order.
/// Reads page out of the cached window by cursor.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TopK {
    sort: Vec<String>,
    order: SortDirection,
    limit: usize,
}

impl TopK {
    pub fn new(prefix: &str, options: TopKOptions) -> Result<Self, IndexError> {
        if options.sort.is_empty() {
            return Err(IndexError::invalid_config(
                prefix,
                "top-k index requires sort columns",
            ));
        }
        if options.limit == 0 {
            return Err(IndexError::invalid_config(
                prefix,
                "top-k limit must be positive",
            ));
        }

        Ok(Self {
            sort: options.sort,
            order: options.order,
            limit: options.limit,
        })
    }

    #[must_use]
    pub fn sort_columns(&self) -> &[String] {
        &self.sort
    }

    #[must_use]
    pub const fn order(&self) -> SortDirection {
        self.order
    }

    /// Cursor that resumes pagination at `row`.
    #[must_use]
    pub fn offset_value_for(&self, row: &Row) -> String {
        join_cursor(
            self.sort
                .iter()
                .map(|column| row.canonical(column).canonical_text()),
        )
    }

    fn compare(&self, a: &Row, b: &Row) -> Ordering {
        self.sort
            .iter()
            .map(|column| a.canonical(column).cmp(&b.canonical(column)))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl BucketStrategy for TopK {
    fn capacity(&self) -> usize {
        self.limit
    }

    fn query_options(&self) -> StoreQueryOptions {
        self.sort.iter().fold(
            StoreQueryOptions::default().limit(self.limit),
            |options, column| options.order_by(column.as_str(), self.order),
        )
    }

    fn sort_index(&self, mut rows: Bucket) -> Bucket {
        rows.sort_by(|a, b| self.compare(a, b));
        if self.order.is_desc() {
            rows.reverse();
        }

        rows
    }

    fn limit_index_size(&self, _prefix: &str, mut rows: Bucket) -> Result<Bucket, IndexError> {
        rows.truncate(self.limit);

        Ok(rows)
    }

    fn sort(&self) -> Option<(&[String], SortDirection)> {
        Some((&self.sort, self.order))
    }

    fn can_answer(&self, options: &QueryOptions) -> bool {
        if options.sort.as_ref().is_some_and(|sort| *sort != self.sort) {
            return false;
        }
        if options.order.is_some_and(|order| order != self.order) {
            return false;
        }

        // an id cursor only maps onto a single-column forward walk
        options.offset_id.is_none()
            || (options.offset_dir == OffsetDir::Fwd && self.sort.len() == 1)
    }

    fn filter_results(
        &self,
        prefix: &str,
        results: BTreeMap<usize, Bucket>,
        options: &QueryOptions,
    ) -> Result<BTreeMap<usize, Bucket>, IndexError> {
        results
            .into_iter()
            .map(|(position, rows)| {
                let rows = page::paginate(prefix, rows, &self.sort, self.order, options, self.limit)?;

                Ok((position, rows))
            })
            .collect()
    }
}

/// Ordered, capped index.
pub type TopKIndex = FeatureIndex<TopK>;

impl FeatureIndex<TopK> {
    pub fn new<I, C>(
        cache: Rc<dyn VolatileCache>,
        store: Rc<dyn PersistentStore>,
        namespace: CacheNamespace,
        indexed: I,
        options: TopKOptions,
    ) -> Result<Self, IndexError>
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        let strategy = TopK::new(&namespace.prefix, options)?;

        Self::with_strategy(cache, store, namespace, indexed, strategy)
    }

    /// Top-k index whose buckets hold only the keys of `shallow`; full rows
    /// are read back through it.
    pub fn with_shallow<I, C>(
        cache: Rc<dyn VolatileCache>,
        store: Rc<dyn PersistentStore>,
        namespace: CacheNamespace,
        indexed: I,
        options: TopKOptions,
        shallow: Rc<UniqueIndex>,
    ) -> Result<Self, IndexError>
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        let index = Self::new(cache, store, namespace, indexed, options)?;
        let compactor = ShallowCompactor::new(shallow, index.strategy().sort_columns());

        Ok(index.with_compactor(Box::new(compactor)))
    }

    /// Cursor that resumes pagination at `row`.
    #[must_use]
    pub fn offset_value_for(&self, row: &Row) -> String {
        self.strategy().offset_value_for(row)
    }
}

///
/// TESTS
///
