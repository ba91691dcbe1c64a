#[cfg(test)]
mod tests;

use crate::row::Row;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};
use xxhash_rust::xxh3::Xxh3;

/// Bucket-hash format version byte; bump to orphan every cached bucket.
pub(crate) const BUCKET_HASH_VERSION: u8 = 2;

/// Stable XXH3 seed used for bucket hashing across releases.
pub(crate) const BUCKET_HASH_SEED: u64 = 0;

/// Separator between the parts of a rendered cache key.
pub const CACHE_KEY_SEPARATOR: char = ':';

///
/// CacheNamespace
///
/// Everything besides the bucket key that feeds a cache key: the index's
/// prefix, the storage domain being cached, and the cache format version.
/// Passed explicitly at construction; there is no process-wide default.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CacheNamespace {
    pub prefix: String,
    pub domain: String,
    #[serde(default = "CacheNamespace::default_version")]
    pub version: u32,
}

impl CacheNamespace {
    #[must_use]
    pub fn new(prefix: impl Into<String>, domain: impl Into<String>, version: u32) -> Self {
        Self {
            prefix: prefix.into(),
            domain: domain.into(),
            version,
        }
    }

    const fn default_version() -> u32 {
        1
    }
}

///
/// BucketKey
///
/// Normalized assignment of every indexed column. Each value is held as its
/// variant tag plus canonical text and iterates in column-name order, so two
/// queries that differ only in attribute order or id encoding produce equal
/// keys, while values the store tells apart (`5` and `"5"`) never share one.
///

#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct BucketKey {
    parts: BTreeMap<String, (u8, String)>,
}

impl BucketKey {
    /// Build a key from a query that must name exactly `indexed_ordered`.
    ///
    /// Returns `None` when the query's column set differs.
    #[must_use]
    pub fn from_query(indexed_ordered: &[String], query: &Row) -> Option<Self> {
        if query.len() != indexed_ordered.len()
            || !indexed_ordered.iter().all(|column| query.contains_key(column))
        {
            return None;
        }

        Some(Self::normalize(query))
    }

    /// Build a key from a written row, ignoring non-indexed columns.
    ///
    /// Returns `None` when the row is missing (or nulls) an indexed column.
    #[must_use]
    pub fn from_row(indexed: &[String], row: &Row) -> Option<Self> {
        row.split(indexed).map(|split| Self::normalize(&split))
    }

    fn normalize(row: &Row) -> Self {
        let parts = row
            .iter()
            .map(|(column, value)| {
                let value = value.canonical_for(column);

                (column.clone(), (value.tag(), value.canonical_text()))
            })
            .collect();

        Self { parts }
    }

    /// Stable 128-bit digest of this key as 32 lowercase hex digits.
    #[must_use]
    #[expect(clippy::cast_possible_truncation)]
    pub fn hash(&self) -> String {
        let mut h = Xxh3::with_seed(BUCKET_HASH_SEED);
        h.update(&[BUCKET_HASH_VERSION]);
        h.update(&(self.parts.len() as u32).to_be_bytes());

        // length-framed so ("ab", "c") and ("a", "bc") never collide
        for (column, (tag, text)) in &self.parts {
            h.update(&(column.len() as u32).to_be_bytes());
            h.update(column.as_bytes());
            h.update(&[*tag]);
            h.update(&(text.len() as u32).to_be_bytes());
            h.update(text.as_bytes());
        }

        format!("{:032x}", h.digest128())
    }
}

///
/// CacheKey
/// Opaque key handed to the volatile cache.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct CacheKey(String);

impl CacheKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Combine namespace and bucket hash into the final cache key.
#[must_use]
pub fn make_cache_key(namespace: &CacheNamespace, hash: &str) -> CacheKey {
    CacheKey(format!(
        "{prefix}{sep}{domain}{sep}{hash}{sep}{version}",
        prefix = namespace.prefix,
        domain = namespace.domain,
        version = namespace.version,
        sep = CACHE_KEY_SEPARATOR,
    ))
}
