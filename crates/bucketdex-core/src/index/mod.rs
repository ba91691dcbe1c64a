//! Bucketed secondary indexes.
//!
//! One engine (`FeatureIndex`) owns cache keys, batched reads, store
//! fallback and write-path invalidation. Specializations plug in through
//! [`BucketStrategy`]: [`TopK`] for capped ordered buckets, [`Unique`] for
//! single-row buckets. [`DerivedKeyIndex`] wraps an engine whose key column
//! is resolved through a relationship.

mod derived;
mod error;
mod feature;
mod options;
mod page;
mod strategy;
mod top_k;
mod unique;


pub use derived::{DerivedKeyIndex, KeyResolver, MAX_RESOLVE_DEPTH, OwnerLookup, RelationError};
pub use error::IndexError;
pub use feature::FeatureIndex;
pub use options::{OffsetDir, QueryOptions, join_cursor};
pub use page::{Window, compare_row_to_offset, offset_limit, paginate};
pub use strategy::BucketStrategy;
pub use top_k::{TopK, TopKIndex, TopKOptions};
pub use unique::{Unique, UniqueIndex};

use crate::{
    direction::SortDirection,
    row::{Bucket, Metadata, Row},
};
use std::collections::BTreeMap;

///
/// Index
///
/// Read side of an index, as seen by callers and the locator.
///

pub trait Index {
    fn prefix(&self) -> &str;

    /// Indexed columns in construction order.
    fn indexed_columns(&self) -> &[String];

    /// Maximum rows per bucket.
    fn limit(&self) -> usize;

    /// Sort columns and direction buckets are kept in, if ordered.
    fn ordering(&self) -> Option<(&[String], SortDirection)> {
        None
    }

    /// Whether a query on `columns` with `options` can be served here.
    fn can_answer(&self, columns: &[&str], options: &QueryOptions) -> bool;

    /// Buckets for each query, keyed by query position.
    ///
    /// Queries with an empty bucket are omitted.
    fn find_multi(
        &self,
        queries: &[Row],
        options: &QueryOptions,
    ) -> Result<BTreeMap<usize, Bucket>, IndexError>;

    fn find(&self, query: &Row, options: &QueryOptions) -> Result<Option<Bucket>, IndexError> {
        let mut found = self.find_multi(std::slice::from_ref(query), options)?;

        Ok(found.remove(&0))
    }

    /// Whether every query can be answered from cache alone.
    fn found_multi(&self, queries: &[Row]) -> Result<bool, IndexError>;

    fn found(&self, query: &Row) -> Result<bool, IndexError> {
        self.found_multi(std::slice::from_ref(query))
    }
}

///
/// LifecycleHandler
///
/// Write-path hooks, called after the durable write of `object` commits.
/// Rows are full column maps, never partial diffs.
///

pub trait LifecycleHandler<O: ?Sized> {
    fn on_after_insert(&self, object: &O, new_row: &Row, metadata: &Metadata)
    -> Result<(), IndexError>;

    fn on_after_update(
        &self,
        object: &O,
        old_row: &Row,
        new_row: &Row,
        metadata: &Metadata,
    ) -> Result<(), IndexError>;

    fn on_after_remove(&self, object: &O, old_row: &Row, metadata: &Metadata)
    -> Result<(), IndexError>;

    fn on_after_load(&self, _object: &O, _row: &Row) -> Result<(), IndexError> {
        Ok(())
    }

    /// Reset index-local state; the shared cache is left alone.
    fn on_after_clear(&self) {}
}
