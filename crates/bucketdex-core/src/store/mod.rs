//! Persistent store contract.
//!
//! The store is the source of truth; indexes only ever read from it.

mod memory;

pub use memory::MemoryStore;

use crate::{
    direction::SortDirection,
    error::{ErrorClass, ErrorOrigin},
    row::{Bucket, Row},
};
use std::{collections::BTreeMap, fmt};
use thiserror::Error as ThisError;

///
/// StoreError
///

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("invalid store query: {0}")]
    InvalidQuery(String),
}

impl StoreError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Unavailable(_) => ErrorClass::Internal,
            Self::InvalidQuery(_) => ErrorClass::Unsupported,
        }
    }

    #[must_use]
    pub const fn origin(&self) -> ErrorOrigin {
        ErrorOrigin::Store
    }
}

///
/// OrderBy
/// One `column DIRECTION` term of an `ORDER BY` clause.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

impl OrderBy {
    #[must_use]
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.column, self.direction)
    }
}

///
/// StoreQueryOptions
/// `LIMIT` and `ORDER BY` applied independently to every query of a batch.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StoreQueryOptions {
    pub limit: Option<usize>,
    pub order_by: Vec<OrderBy>,
}

impl StoreQueryOptions {
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by.push(OrderBy::new(column, direction));
        self
    }
}

///
/// PersistentStore
///
/// Each query is an equality predicate over its columns. Results are keyed
/// by query position; queries with no matching rows may be omitted.
///

pub trait PersistentStore {
    fn find_multi(
        &self,
        queries: &[Row],
        options: &StoreQueryOptions,
    ) -> Result<BTreeMap<usize, Bucket>, StoreError>;

    fn find(&self, query: &Row, options: &StoreQueryOptions) -> Result<Bucket, StoreError> {
        let mut found = self.find_multi(std::slice::from_ref(query), options)?;

        Ok(found.remove(&0).unwrap_or_default())
    }
}
