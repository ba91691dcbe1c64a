//! Row compaction for cached buckets.
//!
//! A compactor shrinks rows before they are cached and restores them after
//! a cache read. Store-sourced rows never pass through expansion.

mod feature;
mod shallow;

pub use feature::FeatureCompactor;
pub use shallow::ShallowCompactor;

use crate::{
    index::IndexError,
    row::{Bucket, Row},
};
use std::collections::BTreeMap;

///
/// RowCompactor
///

pub trait RowCompactor {
    fn compact_row(&self, row: &Row) -> Result<Row, IndexError>;

    /// Restore cache-sourced buckets to full rows.
    ///
    /// Both maps are keyed by query position; `queries` holds the query each
    /// bucket answered. Rows that can no longer be restored are dropped.
    fn expand_cache_result(
        &self,
        cached: BTreeMap<usize, Bucket>,
        queries: &BTreeMap<usize, Row>,
    ) -> Result<BTreeMap<usize, Bucket>, IndexError>;

    /// Whether expansion reads from somewhere besides the bucket itself.
    fn defers_expansion(&self) -> bool {
        false
    }

    /// Whether every row in `cached` can be expanded without a store read.
    fn expanded_found(&self, _cached: &BTreeMap<usize, Bucket>) -> Result<bool, IndexError> {
        Ok(true)
    }
}
