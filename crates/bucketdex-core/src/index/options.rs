use crate::{
    OFFSET_VALUE_SEPARATOR,
    direction::SortDirection,
    store::StoreQueryOptions,
    value::Value,
};
use serde::{Deserialize, Serialize};

///
/// OffsetDir
/// Which way a page extends from its cursor.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetDir {
    #[default]
    Fwd,
    Rev,
}

///
/// QueryOptions
///
/// Per-read options. They shape the page returned to the caller; they never
/// change what a bucket holds.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct QueryOptions {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub offset_value: Option<String>,
    pub offset_id: Option<Value>,
    pub offset_dir: OffsetDir,
    pub include_offset: bool,
    pub offset_elastic: bool,
    pub sort: Option<Vec<String>>,
    pub order: Option<SortDirection>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            limit: None,
            offset: None,
            offset_value: None,
            offset_id: None,
            offset_dir: OffsetDir::Fwd,
            include_offset: false,
            offset_elastic: true,
            sort: None,
            order: None,
        }
    }
}

impl QueryOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    #[must_use]
    pub fn offset_value(mut self, cursor: impl Into<String>) -> Self {
        self.offset_value = Some(cursor.into());
        self
    }

    #[must_use]
    pub fn offset_id(mut self, id: impl Into<Value>) -> Self {
        self.offset_id = Some(id.into());
        self
    }

    #[must_use]
    pub const fn offset_dir(mut self, dir: OffsetDir) -> Self {
        self.offset_dir = dir;
        self
    }

    #[must_use]
    pub const fn include_offset(mut self, include: bool) -> Self {
        self.include_offset = include;
        self
    }

    #[must_use]
    pub const fn offset_elastic(mut self, elastic: bool) -> Self {
        self.offset_elastic = elastic;
        self
    }

    #[must_use]
    pub fn sort<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sort = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub const fn order(mut self, order: SortDirection) -> Self {
        self.order = Some(order);
        self
    }

    /// Cursor to paginate from: the offset value, else the offset id.
    #[must_use]
    pub fn cursor(&self) -> Option<String> {
        self.offset_value.clone().or_else(|| {
            self.offset_id
                .as_ref()
                .map(|id| id.canonical_for("offset_id").canonical_text())
        })
    }

    /// Rows the caller wants to reach into a bucket: `offset + limit`.
    #[must_use]
    pub fn reach(&self) -> Option<usize> {
        self.limit
            .map(|limit| limit.saturating_add(self.offset.unwrap_or(0)))
    }

    /// Store options for an uncached read: order only, paging happens after.
    #[must_use]
    pub fn fallback_store_options(&self) -> StoreQueryOptions {
        let order = self.order.unwrap_or_default();

        self.sort
            .iter()
            .flatten()
            .fold(StoreQueryOptions::default(), |options, column| {
                options.order_by(column.as_str(), order)
            })
    }
}

/// Join cursor components with the offset-value separator.
#[must_use]
pub fn join_cursor<I, S>(components: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for (i, component) in components.into_iter().enumerate() {
        if i > 0 {
            out.push(OFFSET_VALUE_SEPARATOR);
        }
        out.push_str(component.as_ref());
    }

    out
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    #[test]
    fn defaults_are_forward_and_elastic() {
        let options = QueryOptions::default();

        assert_eq!(options.offset_dir, OffsetDir::Fwd);
        assert!(options.offset_elastic);
        assert!(!options.include_offset);
        assert!(options.cursor().is_none());
    }

    #[test]
    fn decodes_kebab_case_option_names() {
        let options: QueryOptions = serde_json::from_str(
            r#"{"limit":10,"offset-value":"4|2","offset-dir":"rev","offset-elastic":false}"#,
        )
        .expect("options should decode");

        assert_eq!(options.limit, Some(10));
        assert_eq!(options.cursor().as_deref(), Some("4|2"));
        assert_eq!(options.offset_dir, OffsetDir::Rev);
        assert!(!options.offset_elastic);
    }

    #[test]
    fn offset_id_becomes_canonical_cursor() {
        let id = Ulid::from_parts(7, 1);
        let options = QueryOptions::new().offset_id(id.to_bytes().to_vec());

        assert_eq!(options.cursor(), Some(id.to_string()));
    }

    #[test]
    fn fallback_options_order_without_limit() {
        let options = QueryOptions::new()
            .limit(5)
            .sort(["created", "id"])
            .order(SortDirection::Asc);
        let store = options.fallback_store_options();

        assert_eq!(store.limit, None);
        assert_eq!(
            store
                .order_by
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
            vec!["created ASC", "id ASC"]
        );
    }

    #[test]
    fn join_cursor_uses_separator() {
        assert_eq!(join_cursor(["4", "b"]), "4|b");
        assert_eq!(join_cursor(Vec::<String>::new()), "");
    }
}
