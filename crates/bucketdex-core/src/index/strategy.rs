use crate::{
    direction::SortDirection,
    index::{IndexError, options::QueryOptions},
    row::Bucket,
    store::StoreQueryOptions,
};
use std::collections::BTreeMap;

///
/// BucketStrategy
///
/// What a specialization contributes to the shared bucket engine: how big a
/// bucket may grow, how the store is asked to fill it, how its rows are
/// ordered and capped, and how a read is paged out of it.
///

pub trait BucketStrategy {
    /// Maximum rows one bucket holds.
    fn capacity(&self) -> usize;

    /// Fixed options for store reads on a cache miss.
    fn query_options(&self) -> StoreQueryOptions;

    fn sort_index(&self, rows: Bucket) -> Bucket {
        rows
    }

    /// Cap `rows` to the bucket capacity.
    fn limit_index_size(&self, prefix: &str, rows: Bucket) -> Result<Bucket, IndexError>;

    /// Sort columns and direction, for ordered buckets.
    fn sort(&self) -> Option<(&[String], SortDirection)> {
        None
    }

    /// Strategy-specific refusals beyond the column-set check.
    fn can_answer(&self, _options: &QueryOptions) -> bool {
        true
    }

    /// Shape the buckets of one read into the page the caller asked for.
    fn filter_results(
        &self,
        _prefix: &str,
        results: BTreeMap<usize, Bucket>,
        _options: &QueryOptions,
    ) -> Result<BTreeMap<usize, Bucket>, IndexError> {
        Ok(results)
    }
}
