use crate::{
    direction::SortDirection,
    index::{
        BucketStrategy, FeatureIndex, Index, IndexError, LifecycleHandler, QueryOptions,
        UniqueIndex,
    },
    row::{Bucket, Metadata, Row},
    value::Value,
};
use std::{collections::BTreeMap, rc::Rc};
use thiserror::Error as ThisError;

/// Parent hops tried before a relationship is declared unresolvable.
pub const MAX_RESOLVE_DEPTH: usize = 64;

///
/// RelationError
/// A relationship could not be followed from one record.
///

#[derive(Debug, ThisError)]
#[error("{reason}")]
pub struct RelationError {
    reason: String,
}

impl RelationError {
    /// The relationship no longer exists, e.g. mid-removal.
    #[must_use]
    pub fn severed(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

///
/// KeyResolver
///
/// Resolves the root a written record hangs off. Resolution tries the write
/// metadata, then the relationship itself, then the record's parent,
/// recursively. Without an [`OwnerLookup`] the root is the derived value.
///

pub trait KeyResolver {
    type Object;

    /// Derived column, one of the index's indexed columns.
    fn column(&self) -> &str;

    /// Root already resolved by the writer, if any.
    fn from_metadata(&self, metadata: &Metadata) -> Option<Value> {
        metadata.get(self.column()).cloned()
    }

    fn traverse(&self, object: &Self::Object) -> Result<Value, RelationError>;

    /// Record to retry from when the relationship is severed.
    fn parent(&self, _object: &Self::Object) -> Option<Self::Object> {
        None
    }

    /// Identifier used in diagnostics.
    fn describe(&self, object: &Self::Object) -> String;
}

///
/// OwnerLookup
///
/// Maps a resolved root to its owner through a unique index: the row found
/// under `key_column = root` supplies `owner_column`.
///

pub struct OwnerLookup {
    index: Rc<UniqueIndex>,
    key_column: String,
    owner_column: String,
}

impl OwnerLookup {
    #[must_use]
    pub fn new(
        index: Rc<UniqueIndex>,
        key_column: impl Into<String>,
        owner_column: impl Into<String>,
    ) -> Self {
        Self {
            index,
            key_column: key_column.into(),
            owner_column: owner_column.into(),
        }
    }

    fn owner(&self, root: Value, record: impl FnOnce() -> String) -> Result<Value, IndexError> {
        let query = Row::new().with(self.key_column.as_str(), root.clone());
        let owner = self
            .index
            .get(&query)?
            .map(|row| row.canonical(&self.owner_column))
            .filter(|value| !value.is_null());

        owner.ok_or_else(|| IndexError::UnresolvableRelationship {
            column: self.owner_column.clone(),
            record: record(),
            reason: format!(
                "no '{}' row for {} = {}",
                self.index.prefix(),
                self.key_column,
                root.canonical_text()
            ),
        })
    }
}

///
/// DerivedKeyIndex
///
/// Index whose derived column is resolved through a relationship instead of
/// being read off the written row. Answers one query per call.
///

pub struct DerivedKeyIndex<S, R> {
    inner: FeatureIndex<S>,
    resolver: R,
    owner: Option<OwnerLookup>,
}

impl<S, R> DerivedKeyIndex<S, R>
where
    S: BucketStrategy,
    R: KeyResolver,
{
    pub fn new(inner: FeatureIndex<S>, resolver: R) -> Result<Self, IndexError> {
        if !inner
            .indexed_columns()
            .iter()
            .any(|column| column == resolver.column())
        {
            return Err(IndexError::invalid_config(
                inner.prefix(),
                format!("derived column '{}' is not indexed", resolver.column()),
            ));
        }

        Ok(Self {
            inner,
            resolver,
            owner: None,
        })
    }

    #[must_use]
    pub fn with_owner_lookup(mut self, lookup: OwnerLookup) -> Self {
        self.owner = Some(lookup);
        self
    }

    #[must_use]
    pub const fn inner(&self) -> &FeatureIndex<S> {
        &self.inner
    }

    /// Resolve the derived column for `object`.
    pub fn resolve(&self, object: &R::Object, metadata: &Metadata) -> Result<Value, IndexError> {
        let root = match self.resolver.from_metadata(metadata) {
            Some(value) => value,
            None => self.resolve_from(object, object, 0)?,
        };

        match &self.owner {
            Some(lookup) => lookup.owner(root, || self.resolver.describe(object)),
            None => Ok(root),
        }
    }

    fn resolve_from(
        &self,
        record: &R::Object,
        current: &R::Object,
        depth: usize,
    ) -> Result<Value, IndexError> {
        let unresolvable = |reason: String| IndexError::UnresolvableRelationship {
            column: self.resolver.column().to_string(),
            record: self.resolver.describe(record),
            reason,
        };

        if depth > MAX_RESOLVE_DEPTH {
            return Err(unresolvable(format!(
                "no resolution within {MAX_RESOLVE_DEPTH} parent hops"
            )));
        }

        let severed = match self.resolver.traverse(current) {
            Ok(value) if !value.is_null() => return Ok(value),
            Ok(_) => RelationError::severed("relationship resolved to null"),
            Err(err) => err,
        };

        match self.resolver.parent(current) {
            Some(parent) => self.resolve_from(record, &parent, depth + 1),
            None => Err(unresolvable(severed.to_string())),
        }
    }

    fn keyed_row(
        &self,
        object: &R::Object,
        row: &Row,
        metadata: &Metadata,
    ) -> Result<Row, IndexError> {
        let value = self.resolve(object, metadata)?;

        Ok(row.clone().with(self.resolver.column(), value))
    }
}

impl<S, R> Index for DerivedKeyIndex<S, R>
where
    S: BucketStrategy,
    R: KeyResolver,
{
    fn prefix(&self) -> &str {
        self.inner.prefix()
    }

    fn indexed_columns(&self) -> &[String] {
        self.inner.indexed_columns()
    }

    fn limit(&self) -> usize {
        self.inner.limit()
    }

    fn ordering(&self) -> Option<(&[String], SortDirection)> {
        self.inner.ordering()
    }

    fn can_answer(&self, columns: &[&str], options: &QueryOptions) -> bool {
        self.inner.can_answer(columns, options)
    }

    fn find_multi(
        &self,
        queries: &[Row],
        options: &QueryOptions,
    ) -> Result<BTreeMap<usize, Bucket>, IndexError> {
        if queries.len() > 1 {
            return Err(IndexError::TooManyQueries {
                prefix: self.prefix().to_string(),
                count: queries.len(),
            });
        }

        self.inner.find_multi(queries, options)
    }

    fn found_multi(&self, queries: &[Row]) -> Result<bool, IndexError> {
        self.inner.found_multi(queries)
    }
}

impl<S, R> LifecycleHandler<R::Object> for DerivedKeyIndex<S, R>
where
    S: BucketStrategy,
    R: KeyResolver,
{
    fn on_after_insert(
        &self,
        object: &R::Object,
        new_row: &Row,
        metadata: &Metadata,
    ) -> Result<(), IndexError> {
        let keyed = self.keyed_row(object, new_row, metadata)?;

        self.inner.on_after_insert(object, &keyed, metadata)
    }

    fn on_after_update(
        &self,
        object: &R::Object,
        old_row: &Row,
        new_row: &Row,
        metadata: &Metadata,
    ) -> Result<(), IndexError> {
        let value = self.resolve(object, metadata)?;
        let column = self.resolver.column();
        let old_keyed = old_row.clone().with(column, value.clone());
        let new_keyed = new_row.clone().with(column, value);

        self.inner
            .on_after_update(object, &old_keyed, &new_keyed, metadata)
    }

    fn on_after_remove(
        &self,
        object: &R::Object,
        old_row: &Row,
        metadata: &Metadata,
    ) -> Result<(), IndexError> {
        let keyed = self.keyed_row(object, old_row, metadata)?;

        self.inner.on_after_remove(object, &keyed, metadata)
    }

    fn on_after_clear(&self) {
        LifecycleHandler::<R::Object>::on_after_clear(&self.inner);
    }
}
