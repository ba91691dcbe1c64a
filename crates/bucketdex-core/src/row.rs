use crate::value::Value;
use derive_more::{Deref, DerefMut};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered rows sharing one bucket key.
pub type Bucket = Vec<Row>;

///
/// Row
///
/// One record as persisted: a flat column → value mapping. Columns iterate
/// in name order, which keeps compaction and comparisons deterministic.
///

#[derive(Clone, Debug, Default, Deref, DerefMut, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row(BTreeMap<String, Value>);

impl Row {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(column.into(), value.into());
        self
    }

    /// Project `columns` out of this row.
    ///
    /// Returns `None` when any column is missing or null; such a row cannot
    /// be placed in a bucket keyed by those columns.
    #[must_use]
    pub fn split(&self, columns: &[String]) -> Option<Self> {
        let mut split = Self::new();
        for column in columns {
            match self.0.get(column) {
                Some(value) if !value.is_null() => {
                    split.0.insert(column.clone(), value.clone());
                }
                _ => return None,
            }
        }

        Some(split)
    }

    /// Copy of this row with every identifier-like value in canonical form.
    #[must_use]
    pub fn with_canonical_ids(&self) -> Self {
        self.0
            .iter()
            .map(|(column, value)| (column.clone(), value.canonical_for(column)))
            .collect()
    }

    /// Canonical value of `column`, or `Value::Null` when absent.
    #[must_use]
    pub fn canonical(&self, column: &str) -> Value {
        self.0
            .get(column)
            .map_or(Value::Null, |value| value.canonical_for(column))
    }

    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    /// JSON rendering for diagnostics.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self.0))
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(column, value)| (column.into(), value.into()))
                .collect(),
        )
    }
}

///
/// Metadata
///
/// Out-of-band context handed to write hooks alongside the row, such as an
/// owner id the writing transaction already resolved.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Metadata(BTreeMap<String, Value>);

impl Metadata {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|value| !value.is_null())
    }
}

///
/// TESTS
///
