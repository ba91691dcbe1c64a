//! Index selection for reads and lifecycle fan-out for writes.

use crate::{
    index::{Index, IndexError, LifecycleHandler, QueryOptions, paginate},
    obs::sink::{self, MetricsEvent},
    row::{Bucket, Metadata, Row},
    store::PersistentStore,
};
use std::{collections::BTreeMap, rc::Rc};

///
/// IndexHandler
/// An index that also receives the write hooks of `O`.
///

pub trait IndexHandler<O: ?Sized>: Index + LifecycleHandler<O> {}

impl<O: ?Sized, T: Index + LifecycleHandler<O>> IndexHandler<O> for T {}

///
/// IndexLocator
///
/// Routes reads for one record type to the best registered index, falling
/// back to uncached store reads, and forwards every write hook to every
/// index.
///

pub struct IndexLocator<O: ?Sized> {
    store: Rc<dyn PersistentStore>,
    indexes: Vec<Rc<dyn IndexHandler<O>>>,
}

impl<O: ?Sized> IndexLocator<O> {
    #[must_use]
    pub fn new(store: Rc<dyn PersistentStore>) -> Self {
        Self {
            store,
            indexes: Vec::new(),
        }
    }

    pub fn register(&mut self, index: Rc<dyn IndexHandler<O>>) {
        self.indexes.push(index);
    }

    #[must_use]
    pub fn indexes(&self) -> &[Rc<dyn IndexHandler<O>>] {
        &self.indexes
    }

    /// Index able to answer `columns` under `options`.
    ///
    /// With a caller limit the smallest sufficient index wins, otherwise the
    /// largest, so unbounded reads see as many rows as any index holds.
    #[must_use]
    pub fn index_for(
        &self,
        columns: &[&str],
        options: &QueryOptions,
    ) -> Option<&Rc<dyn IndexHandler<O>>> {
        let candidates = self
            .indexes
            .iter()
            .filter(|index| index.can_answer(columns, options));

        if options.limit.is_some() {
            candidates.min_by_key(|index| index.limit())
        } else {
            candidates.max_by_key(|index| index.limit())
        }
    }

    pub fn find(&self, query: &Row, options: &QueryOptions) -> Result<Option<Bucket>, IndexError> {
        let mut found = self.find_multi(std::slice::from_ref(query), options)?;

        Ok(found.remove(&0))
    }

    /// Answer `queries` through an index, or straight from the store when no
    /// index can serve them or the cursor lies beyond the cached window.
    pub fn find_multi(
        &self,
        queries: &[Row],
        options: &QueryOptions,
    ) -> Result<BTreeMap<usize, Bucket>, IndexError> {
        let Some(first) = queries.first() else {
            return Ok(BTreeMap::new());
        };

        let columns = first.keys().map(String::as_str).collect::<Vec<_>>();
        let Some(index) = self.index_for(&columns, options) else {
            return self.find_uncached(None, queries, options);
        };

        match index.find_multi(queries, options) {
            Err(err) if err.is_recoverable() => {
                self.find_uncached(Some(index.as_ref()), queries, options)
            }
            result => result,
        }
    }

    pub fn found(&self, query: &Row) -> Result<bool, IndexError> {
        self.found_multi(std::slice::from_ref(query))
    }

    /// Whether `queries` can be answered from cache alone.
    pub fn found_multi(&self, queries: &[Row]) -> Result<bool, IndexError> {
        let Some(first) = queries.first() else {
            return Ok(true);
        };

        let columns = first.keys().map(String::as_str).collect::<Vec<_>>();
        match self.index_for(&columns, &QueryOptions::default()) {
            Some(index) => index.found_multi(queries),
            None => Ok(false),
        }
    }

    // Store read paged in memory. The caller's sort wins; after an offset
    // miss the index's own order is kept so the cursor still applies.
    fn find_uncached(
        &self,
        index: Option<&dyn IndexHandler<O>>,
        queries: &[Row],
        options: &QueryOptions,
    ) -> Result<BTreeMap<usize, Bucket>, IndexError> {
        let prefix = index.map_or("store", |index| index.prefix());
        sink::record(MetricsEvent::StoreFallback {
            prefix: index.map(|index| index.prefix()),
        });

        let options = match (&options.sort, index.and_then(|index| index.ordering())) {
            (None, Some((sort, order))) => options
                .clone()
                .sort(sort.iter().cloned())
                .order(options.order.unwrap_or(order)),
            _ => options.clone(),
        };
        let sort = options.sort.clone().unwrap_or_default();
        let order = options.order.unwrap_or_default();

        let found = self
            .store
            .find_multi(queries, &options.fallback_store_options())?;

        let mut results = BTreeMap::new();
        for (position, rows) in found {
            let rows = rows.iter().map(Row::with_canonical_ids).collect::<Vec<_>>();
            let limit = rows.len();
            let page = paginate(prefix, rows, &sort, order, &options, limit)?;
            if !page.is_empty() {
                results.insert(position, page);
            }
        }

        Ok(results)
    }

    // Run `hook` on every index; all run even if one fails.
    fn fan_out(
        &self,
        hook: impl Fn(&dyn IndexHandler<O>) -> Result<(), IndexError>,
    ) -> Result<(), IndexError> {
        let mut first_error = None;
        for index in &self.indexes {
            if let Err(err) = hook(index.as_ref()) {
                first_error.get_or_insert(err);
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    pub fn on_after_insert(
        &self,
        object: &O,
        new_row: &Row,
        metadata: &Metadata,
    ) -> Result<(), IndexError> {
        self.fan_out(|index| index.on_after_insert(object, new_row, metadata))
    }

    pub fn on_after_update(
        &self,
        object: &O,
        old_row: &Row,
        new_row: &Row,
        metadata: &Metadata,
    ) -> Result<(), IndexError> {
        self.fan_out(|index| index.on_after_update(object, old_row, new_row, metadata))
    }

    pub fn on_after_remove(
        &self,
        object: &O,
        old_row: &Row,
        metadata: &Metadata,
    ) -> Result<(), IndexError> {
        self.fan_out(|index| index.on_after_remove(object, old_row, metadata))
    }

    /// Fan a load out to every index.
    ///
    /// Reads here return rows, not objects, so the caller that maps a read
    /// row to its `O` fires this once per mapped row.
    pub fn on_after_load(&self, object: &O, row: &Row) -> Result<(), IndexError> {
        self.fan_out(|index| index.on_after_load(object, row))
    }

    /// Reset index-local state on every index.
    pub fn clear(&self) {
        for index in &self.indexes {
            index.on_after_clear();
        }
    }
}
