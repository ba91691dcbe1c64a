use crate::{
    row::{Bucket, Row},
    store::{PersistentStore, StoreError, StoreQueryOptions},
};
use std::{
    cell::{Cell, RefCell},
    cmp::Ordering,
    collections::BTreeMap,
};

///
/// MemoryStore
///
/// In-memory row store. Rows keep insertion order, which is the order an
/// unsorted query returns them in.
///

#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RefCell<Vec<Row>>,
    queries: Cell<u64>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, row: Row) {
        self.rows.borrow_mut().push(row);
    }

    /// Replace every row matching `query` with `row`; returns how many matched.
    pub fn replace(&self, query: &Row, row: &Row) -> usize {
        let mut replaced = 0;
        for existing in self.rows.borrow_mut().iter_mut() {
            if row_matches(existing, query) {
                *existing = row.clone();
                replaced += 1;
            }
        }

        replaced
    }

    /// Remove every row matching `query`; returns how many were removed.
    pub fn remove_where(&self, query: &Row) -> usize {
        let mut rows = self.rows.borrow_mut();
        let before = rows.len();
        rows.retain(|row| !row_matches(row, query));

        before - rows.len()
    }

    pub fn clear(&self) {
        self.rows.borrow_mut().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.borrow().is_empty()
    }

    /// Number of individual queries served so far.
    #[must_use]
    pub fn query_count(&self) -> u64 {
        self.queries.get()
    }

    fn select(&self, query: &Row, options: &StoreQueryOptions) -> Bucket {
        let mut found = self
            .rows
            .borrow()
            .iter()
            .filter(|row| row_matches(row, query))
            .cloned()
            .collect::<Vec<_>>();

        if !options.order_by.is_empty() {
            found.sort_by(|a, b| {
                options
                    .order_by
                    .iter()
                    .map(|term| {
                        let ord = a.canonical(&term.column).cmp(&b.canonical(&term.column));
                        if term.direction.is_desc() {
                            ord.reverse()
                        } else {
                            ord
                        }
                    })
                    .find(|ord| *ord != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        if let Some(limit) = options.limit {
            found.truncate(limit);
        }

        found
    }
}

// Equality on canonical values; null never matches anything.
fn row_matches(row: &Row, query: &Row) -> bool {
    query.iter().all(|(column, wanted)| {
        let wanted = wanted.canonical_for(column);
        let have = row.canonical(column);

        !wanted.is_null() && have == wanted
    })
}

impl PersistentStore for MemoryStore {
    fn find_multi(
        &self,
        queries: &[Row],
        options: &StoreQueryOptions,
    ) -> Result<BTreeMap<usize, Bucket>, StoreError> {
        if let Some(empty) = queries.iter().position(|query| query.is_empty()) {
            return Err(StoreError::InvalidQuery(format!(
                "query {empty} has no predicates"
            )));
        }

        let mut results = BTreeMap::new();
        for (i, query) in queries.iter().enumerate() {
            self.queries.set(self.queries.get() + 1);
            let found = self.select(query, options);
            if !found.is_empty() {
                results.insert(i, found);
            }
        }

        Ok(results)
    }
}

///
/// TESTS
///
