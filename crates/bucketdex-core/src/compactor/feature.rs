use crate::{
    compactor::RowCompactor,
    index::IndexError,
    row::{Bucket, Row},
};
use std::collections::BTreeMap;

///
/// FeatureCompactor
///
/// Drops the indexed columns from cached rows; every row in a bucket shares
/// them, so expansion copies them back from the query.
///

#[derive(Clone, Debug)]
pub struct FeatureCompactor {
    indexed: Vec<String>,
}

impl FeatureCompactor {
    #[must_use]
    pub fn new(indexed: &[String]) -> Self {
        Self {
            indexed: indexed.to_vec(),
        }
    }
}

impl RowCompactor for FeatureCompactor {
    fn compact_row(&self, row: &Row) -> Result<Row, IndexError> {
        let mut compact = row.with_canonical_ids();
        for column in &self.indexed {
            compact.remove(column);
        }

        Ok(compact)
    }

    fn expand_cache_result(
        &self,
        cached: BTreeMap<usize, Bucket>,
        queries: &BTreeMap<usize, Row>,
    ) -> Result<BTreeMap<usize, Bucket>, IndexError> {
        cached
            .into_iter()
            .map(|(position, rows)| {
                let query = queries
                    .get(&position)
                    .ok_or_else(|| IndexError::internal(format!("no query for bucket {position}")))?
                    .with_canonical_ids();

                let rows = rows
                    .into_iter()
                    .map(|mut row| {
                        row.extend(query.iter().map(|(c, v)| (c.clone(), v.clone())));
                        row
                    })
                    .collect();

                Ok((position, rows))
            })
            .collect()
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use ulid::Ulid;

    #[test]
    fn compaction_drops_indexed_columns_and_expansion_restores_them() {
        let id = Ulid::from_parts(3, 3);
        let compactor = FeatureCompactor::new(&["board_id".to_string()]);
        let row = Row::new()
            .with("board_id", id.to_bytes().to_vec())
            .with("created", 7);

        let compact = compactor.compact_row(&row).expect("compaction should succeed");
        assert_eq!(compact, Row::new().with("created", 7));

        let queries = BTreeMap::from([(0, Row::new().with("board_id", id.to_string()))]);
        let expanded = compactor
            .expand_cache_result(BTreeMap::from([(0, vec![compact])]), &queries)
            .expect("expansion should succeed");

        assert_eq!(expanded[&0][0].get("board_id"), Some(&Value::Ulid(id)));
        assert_eq!(expanded[&0][0], row.with_canonical_ids());
    }

    #[test]
    fn expansion_without_query_is_internal_error() {
        let compactor = FeatureCompactor::new(&["parent".to_string()]);
        let err = compactor
            .expand_cache_result(BTreeMap::from([(1, Vec::new())]), &BTreeMap::new())
            .expect_err("missing query should fail");

        assert!(matches!(err, IndexError::Internal { .. }));
    }
}
