mod id;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt::Write as _};
use ulid::Ulid;

// re-exports
pub use id::{ID_BINARY_LEN, ID_COLUMN_SUFFIX, ID_TEXT_LEN, canonical_id, is_id_column};

///
/// Value
/// One column value of a persisted row.
///
/// Null  → the column is absent for indexing purposes (SQL NULL).
/// Blob  → raw bytes; 16-byte blobs under `*_id` columns are binary ids.
/// Ulid  → canonical identifier form.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Text(String),
    Blob(Vec<u8>),
    Ulid(Ulid),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Variant tag. Orders mixed variants and keeps them apart in bucket keys.
    #[must_use]
    pub(crate) const fn tag(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) => 2,
            Self::Uint(_) => 3,
            Self::Text(_) => 4,
            Self::Blob(_) => 5,
            Self::Ulid(_) => 6,
        }
    }

    /// Return this value in canonical form for the given column.
    ///
    /// Identifier-like values (see [`canonical_id`]) become `Value::Ulid`;
    /// everything else is returned unchanged.
    #[must_use]
    pub fn canonical_for(&self, column: &str) -> Self {
        match canonical_id(column, self) {
            Some(id) => Self::Ulid(id),
            None => self.clone(),
        }
    }

    /// Stable textual rendering used for bucket hashing and cursors.
    #[must_use]
    pub fn canonical_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => String::from(if *b { "1" } else { "0" }),
            Self::Int(i) => i.to_string(),
            Self::Uint(u) => u.to_string(),
            Self::Text(s) => s.clone(),
            Self::Blob(bytes) => {
                let mut out = String::with_capacity(bytes.len() * 2);
                for b in bytes {
                    let _ = write!(out, "{b:02x}");
                }
                out
            }
            Self::Ulid(id) => id.to_string(),
        }
    }

    /// Compare this (canonical) value against one component of a cursor.
    ///
    /// The component is parsed into this value's type when possible so that
    /// numbers and ids compare by value rather than lexically.
    #[must_use]
    pub fn cmp_cursor_component(&self, component: &str) -> Ordering {
        match self {
            Self::Int(v) => component
                .parse::<i64>()
                .map_or_else(|_| v.to_string().as_str().cmp(component), |c| v.cmp(&c)),
            Self::Uint(v) => component
                .parse::<u64>()
                .map_or_else(|_| v.to_string().as_str().cmp(component), |c| v.cmp(&c)),
            Self::Ulid(id) => Ulid::from_string(component)
                .map_or_else(|_| id.to_string().as_str().cmp(component), |c| id.cmp(&c)),
            Self::Null | Self::Bool(_) | Self::Text(_) | Self::Blob(_) => {
                self.canonical_text().as_str().cmp(component)
            }
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        let rank = self.tag().cmp(&other.tag());
        if rank != Ordering::Equal {
            return rank;
        }

        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Uint(a), Self::Uint(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Blob(a), Self::Blob(b)) => a.cmp(b),
            (Self::Ulid(a), Self::Ulid(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Implements `From<T> for Value` for simple conversions.
macro_rules! impl_from_value {
    ( $( $ty:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    }
}

impl_from_value! {
    bool => Bool,
    i8  => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8  => Uint,
    u16 => Uint,
    u32 => Uint,
    u64 => Uint,
    &str => Text,
    String => Text,
    Vec<u8> => Blob,
    Ulid => Ulid,
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
