//! Cache-backed, feature-bucketed secondary indexes over a persistent row
//! store: bucket keys, batched cached reads, top-k pagination, and
//! invalidate-on-write lifecycle hooks.

#[macro_use]
mod macros;

pub mod cache;
pub mod compactor;
pub mod config;
pub mod direction;
pub mod error;
pub mod index;
pub mod key;
pub mod locator;
pub mod obs;
pub mod row;
pub mod store;
pub mod value;

///
/// CONSTANTS
///

/// Bucket size of a top-k index configured without an explicit limit.
pub const DEFAULT_TOP_K_LIMIT: usize = 500;

/// Separator between the components of a pagination cursor.
pub const OFFSET_VALUE_SEPARATOR: char = '|';

///
/// Prelude
///
/// Vocabulary needed to build indexes and issue reads against them.
///

pub mod prelude {
    pub use crate::{
        cache::{MemoryCache, NullCache, VolatileCache},
        direction::SortDirection,
        index::{
            DerivedKeyIndex, Index, IndexError, KeyResolver, LifecycleHandler, OffsetDir,
            QueryOptions, TopKIndex, TopKOptions, UniqueIndex,
        },
        key::CacheNamespace,
        locator::IndexLocator,
        row,
        row::{Bucket, Metadata, Row},
        store::{MemoryStore, PersistentStore},
        value::Value,
    };
}
