use crate::{
    compactor::RowCompactor,
    index::{Index, IndexError, QueryOptions, UniqueIndex},
    obs::sink::{self, MetricsEvent},
    row::{Bucket, Row},
};
use std::{collections::BTreeMap, rc::Rc};

///
/// ShallowCompactor
///
/// Caches only the key columns of a unique index (plus the sort columns
/// pagination needs) and materializes full rows through that index, which
/// keeps its own per-record cache.
///

pub struct ShallowCompactor {
    shallow: Rc<UniqueIndex>,
    sort: Vec<String>,
}

impl ShallowCompactor {
    #[must_use]
    pub fn new(shallow: Rc<UniqueIndex>, sort: &[String]) -> Self {
        Self {
            shallow,
            sort: sort.to_vec(),
        }
    }

    // Unique-index query for one compacted row.
    fn lookup(&self, row: &Row) -> Result<Row, IndexError> {
        row.split(self.shallow.indexed_columns()).ok_or_else(|| {
            IndexError::internal(format!(
                "cached row lacks keys of '{}': {}",
                self.shallow.prefix(),
                row.to_json()
            ))
        })
    }
}

impl RowCompactor for ShallowCompactor {
    fn compact_row(&self, row: &Row) -> Result<Row, IndexError> {
        let canonical = row.with_canonical_ids();
        let mut compact = canonical
            .split(self.shallow.indexed_columns())
            .ok_or_else(|| IndexError::unindexable(self.shallow.prefix(), row))?;

        for column in &self.sort {
            if let Some(value) = canonical.get(column) {
                compact.insert(column.clone(), value.clone());
            }
        }

        Ok(compact)
    }

    fn expand_cache_result(
        &self,
        cached: BTreeMap<usize, Bucket>,
        _queries: &BTreeMap<usize, Row>,
    ) -> Result<BTreeMap<usize, Bucket>, IndexError> {
        let lookups = cached
            .values()
            .flatten()
            .map(|row| self.lookup(row))
            .collect::<Result<Vec<_>, _>>()?;
        let mut found = self.shallow.find_multi(&lookups, &QueryOptions::default())?;

        let mut next = 0;
        let mut dropped = 0_u64;
        let mut expanded = BTreeMap::new();
        for (position, rows) in cached {
            let mut full = Vec::with_capacity(rows.len());
            for _ in rows {
                match found.remove(&next).and_then(|bucket| bucket.into_iter().next()) {
                    Some(row) => full.push(row),
                    None => dropped += 1,
                }
                next += 1;
            }
            expanded.insert(position, full);
        }

        if dropped > 0 {
            sink::record(MetricsEvent::ShallowMiss {
                prefix: self.shallow.prefix(),
                dropped,
            });
        }

        Ok(expanded)
    }

    fn defers_expansion(&self) -> bool {
        true
    }

    fn expanded_found(&self, cached: &BTreeMap<usize, Bucket>) -> Result<bool, IndexError> {
        let lookups = cached
            .values()
            .flatten()
            .map(|row| self.lookup(row))
            .collect::<Result<Vec<_>, _>>()?;

        self.shallow.found_multi(&lookups)
    }
}
