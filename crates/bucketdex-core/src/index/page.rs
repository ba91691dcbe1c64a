//! Cursor pagination over an already-sorted bucket.
//!
//! Shared by top-k indexes (over cached buckets) and the locator's uncached
//! fallback (over store results sorted by the caller's own order).

use crate::{
    OFFSET_VALUE_SEPARATOR,
    direction::SortDirection,
    index::{
        IndexError,
        options::{OffsetDir, QueryOptions},
    },
    obs::sink::{self, MetricsEvent},
    row::{Bucket, Row},
};
use std::cmp::Ordering;

///
/// Window
/// Half-open `[start, start + limit)` slice of a bucket.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Window {
    pub start: usize,
    pub limit: usize,
}

impl Window {
    /// Slice `rows` to this window; out-of-range windows yield nothing.
    #[must_use]
    pub fn apply(self, mut rows: Bucket) -> Bucket {
        if self.start >= rows.len() {
            return Vec::new();
        }

        let mut page = rows.split_off(self.start);
        page.truncate(self.limit);

        page
    }
}

/// Compare a row's sort columns against a `|`-separated cursor.
///
/// Components beyond the row's sort columns are ignored, as are sort
/// columns the cursor does not reach.
#[must_use]
pub fn compare_row_to_offset(row: &Row, sort: &[String], cursor: &str) -> Ordering {
    sort.iter()
        .zip(cursor.split(OFFSET_VALUE_SEPARATOR))
        .map(|(column, component)| row.canonical(column).cmp_cursor_component(component))
        .find(|ord| *ord != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// Position of the first row equal to the cursor or next in bucket order.
fn offset_position(
    rows: &[Row],
    sort: &[String],
    order: SortDirection,
    cursor: &str,
) -> Option<usize> {
    let next = if order.is_desc() {
        Ordering::Less
    } else {
        Ordering::Greater
    };

    rows.iter().position(|row| {
        let ord = compare_row_to_offset(row, sort, cursor);
        ord == Ordering::Equal || ord == next
    })
}

/// Compute the page window for `rows` under `options`.
///
/// `default_limit` applies when the caller gave no limit. Without sort
/// columns there is nothing to locate a cursor by, and only `offset` and
/// `limit` are honoured.
pub fn offset_limit(
    prefix: &str,
    rows: &[Row],
    sort: &[String],
    order: SortDirection,
    options: &QueryOptions,
    default_limit: usize,
) -> Result<Window, IndexError> {
    let limit = options.limit.unwrap_or(default_limit);
    let cursor = options.cursor().filter(|_| !sort.is_empty());

    let Some(cursor) = cursor else {
        let start = match options.offset_dir {
            OffsetDir::Fwd => options.offset.unwrap_or(0),
            OffsetDir::Rev => rows.len().saturating_sub(limit),
        };

        return Ok(Window { start, limit });
    };

    let Some(position) = offset_position(rows, sort, order, &cursor) else {
        sink::record(MetricsEvent::OffsetMiss { prefix });

        return Err(IndexError::OffsetNotFound {
            prefix: prefix.to_string(),
            offset: cursor,
        });
    };

    let window = match options.offset_dir {
        OffsetDir::Fwd => Window {
            start: if options.include_offset {
                position
            } else {
                position + 1
            },
            limit,
        },
        OffsetDir::Rev => {
            let end = if options.include_offset {
                position + 1
            } else {
                position
            };

            match end.checked_sub(limit) {
                Some(start) => Window { start, limit },
                // short of rows before the cursor: inelastic reads shrink
                None if !options.offset_elastic => Window { start: 0, limit: end },
                None => Window { start: 0, limit },
            }
        }
    };

    Ok(window)
}

/// Slice `rows` to the page selected by `options`.
pub fn paginate(
    prefix: &str,
    rows: Bucket,
    sort: &[String],
    order: SortDirection,
    options: &QueryOptions,
    default_limit: usize,
) -> Result<Bucket, IndexError> {
    let window = offset_limit(prefix, &rows, sort, order, options, default_limit)?;

    Ok(window.apply(rows))
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    fn desc_bucket() -> Bucket {
        (1..=8)
            .rev()
            .map(|created| Row::new().with("created", created))
            .collect()
    }

    fn created(rows: &[Row]) -> Vec<i64> {
        rows.iter()
            .map(|row| match row.canonical("created") {
                crate::value::Value::Int(v) => v,
                other => panic!("unexpected created value {other:?}"),
            })
            .collect()
    }

    fn sort() -> Vec<String> {
        vec!["created".to_string()]
    }

    fn page(options: &QueryOptions) -> Result<Vec<i64>, IndexError> {
        paginate("p", desc_bucket(), &sort(), SortDirection::Desc, options, 500)
            .map(|rows| created(&rows))
    }

    #[test]
    fn forward_without_cursor_starts_at_offset() {
        assert_eq!(page(&QueryOptions::new().limit(3)).unwrap(), vec![8, 7, 6]);
        assert_eq!(
            page(&QueryOptions::new().limit(2).offset(3)).unwrap(),
            vec![5, 4]
        );
    }

    #[test]
    fn forward_from_cursor_excludes_or_includes_it() {
        let after = QueryOptions::new().limit(3).offset_value("6");
        assert_eq!(page(&after).unwrap(), vec![5, 4, 3]);

        let from = after.include_offset(true);
        assert_eq!(page(&from).unwrap(), vec![6, 5, 4]);
    }

    #[test]
    fn cursor_between_rows_resolves_to_next_in_order() {
        let bucket = vec![
            Row::new().with("created", 9),
            Row::new().with("created", 5),
            Row::new().with("created", 1),
        ];
        let options = QueryOptions::new().offset_value("7").include_offset(true);

        let rows = paginate("p", bucket, &sort(), SortDirection::Desc, &options, 10)
            .expect("cursor between rows should resolve");
        assert_eq!(created(&rows), vec![5, 1]);
    }

    #[test]
    fn cursor_past_bucket_is_offset_not_found() {
        let err = page(&QueryOptions::new().offset_value("0")).unwrap_err();

        assert!(matches!(err, IndexError::OffsetNotFound { ref offset, .. } if offset == "0"));
    }

    #[test]
    fn reverse_without_cursor_takes_the_tail() {
        let options = QueryOptions::new().limit(3).offset_dir(OffsetDir::Rev);
        assert_eq!(page(&options).unwrap(), vec![3, 2, 1]);

        let wide = QueryOptions::new().limit(20).offset_dir(OffsetDir::Rev);
        assert_eq!(page(&wide).unwrap().len(), 8);
    }

    #[test]
    fn reverse_from_cursor_returns_preceding_rows() {
        let options = QueryOptions::new()
            .limit(2)
            .offset_value("4")
            .offset_dir(OffsetDir::Rev);
        assert_eq!(page(&options).unwrap(), vec![6, 5]);

        let including = options.include_offset(true);
        assert_eq!(page(&including).unwrap(), vec![5, 4]);
    }

    #[test]
    fn reverse_short_of_rows_shrinks_only_when_inelastic() {
        let options = QueryOptions::new()
            .limit(4)
            .offset_value("6")
            .offset_dir(OffsetDir::Rev);

        assert_eq!(page(&options).unwrap(), vec![8, 7, 6, 5]);
        assert_eq!(page(&options.offset_elastic(false)).unwrap(), vec![8, 7]);
    }

    #[test]
    fn multi_column_cursor_breaks_ties() {
        let bucket = vec![
            Row::new().with("created", 5).with("seq", 3),
            Row::new().with("created", 5).with("seq", 2),
            Row::new().with("created", 4).with("seq", 9),
        ];
        let sort = vec!["created".to_string(), "seq".to_string()];
        let options = QueryOptions::new().offset_value("5|3");

        let rows = paginate("p", bucket, &sort, SortDirection::Desc, &options, 10)
            .expect("cursor should resolve");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].canonical("seq"), crate::value::Value::from(2));
    }

    #[test]
    fn window_past_end_is_empty() {
        let window = Window { start: 9, limit: 3 };

        assert!(window.apply(desc_bucket()).is_empty());
    }
}
