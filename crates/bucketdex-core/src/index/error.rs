use crate::{
    error::{ErrorClass, ErrorOrigin},
    row::Row,
    store::StoreError,
};
use thiserror::Error as ThisError;

///
/// IndexError
///
/// Failures surfaced by index reads, write hooks, and construction.
/// Only `OffsetNotFound` is recoverable; everything else is a data-model or
/// caller bug and propagates unchanged.
///

#[derive(Debug, ThisError)]
pub enum IndexError {
    /// A written row cannot supply every indexed column.
    #[error("index '{prefix}': row is missing indexed columns: {row}")]
    UnindexableRow { prefix: String, row: String },

    /// Query column set differs from the indexed columns.
    #[error(
        "index '{prefix}' cannot answer query on [{}], indexed columns are [{}]",
        .columns.join(", "),
        .indexed.join(", ")
    )]
    UnanswerableQuery {
        prefix: String,
        columns: Vec<String>,
        indexed: Vec<String>,
    },

    /// Cursor is not within the cached window; query the store directly.
    #[error("index '{prefix}': offset '{offset}' not found in bucket")]
    OffsetNotFound { prefix: String, offset: String },

    #[error("index '{prefix}': bucket limited to {limit} row(s), found {found}")]
    UniquenessViolation {
        prefix: String,
        limit: usize,
        found: usize,
    },

    #[error("cannot resolve '{column}' for {record}: {reason}")]
    UnresolvableRelationship {
        column: String,
        record: String,
        reason: String,
    },

    #[error("index '{prefix}' answers one query per call, received {count}")]
    TooManyQueries { prefix: String, count: usize },

    #[error("index '{prefix}' is misconfigured: {reason}")]
    InvalidConfig { prefix: String, reason: String },

    #[error("index internal error: {message}")]
    Internal { message: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IndexError {
    pub(crate) fn unindexable(prefix: &str, row: &Row) -> Self {
        Self::UnindexableRow {
            prefix: prefix.to_string(),
            row: row.to_json(),
        }
    }

    pub(crate) fn invalid_config(prefix: &str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            prefix: prefix.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::UnindexableRow { .. } | Self::Internal { .. } => {
                ErrorClass::InvariantViolation
            }
            Self::UnanswerableQuery { .. }
            | Self::TooManyQueries { .. }
            | Self::InvalidConfig { .. } => ErrorClass::Unsupported,
            Self::OffsetNotFound { .. } | Self::UnresolvableRelationship { .. } => {
                ErrorClass::NotFound
            }
            Self::UniquenessViolation { .. } => ErrorClass::Conflict,
            Self::Store(err) => err.class(),
        }
    }

    #[must_use]
    pub const fn origin(&self) -> ErrorOrigin {
        match self {
            Self::UnindexableRow { .. }
            | Self::UniquenessViolation { .. }
            | Self::Internal { .. } => ErrorOrigin::Index,
            Self::UnanswerableQuery { .. }
            | Self::OffsetNotFound { .. }
            | Self::TooManyQueries { .. } => ErrorOrigin::Query,
            Self::UnresolvableRelationship { .. } => ErrorOrigin::Relation,
            Self::InvalidConfig { .. } => ErrorOrigin::Config,
            Self::Store(_) => ErrorOrigin::Store,
        }
    }

    /// Whether the caller can recover by querying the store directly.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::OffsetNotFound { .. })
    }
}

///
/// TESTS
///
