//! Declarative index configuration.

use crate::{
    cache::VolatileCache,
    error::{ErrorClass, ErrorOrigin},
    index::{IndexError, TopKIndex, TopKOptions, UniqueIndex},
    key::CacheNamespace,
    store::PersistentStore,
};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("index config could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("index '{prefix}' is configured as {found}, not {expected}")]
    KindMismatch {
        prefix: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error(transparent)]
    Index(#[from] IndexError),
}

impl ConfigError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Decode(_) | Self::KindMismatch { .. } => ErrorClass::Unsupported,
            Self::Index(err) => err.class(),
        }
    }

    #[must_use]
    pub const fn origin(&self) -> ErrorOrigin {
        ErrorOrigin::Config
    }
}

///
/// IndexKind
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    Unique,
    TopK(TopKOptions),
}

impl IndexKind {
    const fn label(&self) -> &'static str {
        match self {
            Self::Unique => "unique",
            Self::TopK(_) => "top_k",
        }
    }
}

///
/// IndexConfig
///
/// One index as written in configuration:
///
/// ```json
/// { "namespace": { "prefix": "topic_list:list", "domain": "wikidb" },
///   "indexed": ["topic_list_id"],
///   "kind": { "top_k": { "sort": ["workflow_last_update"], "limit": 500 } } }
/// ```
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct IndexConfig {
    pub namespace: CacheNamespace,
    pub indexed: Vec<String>,
    pub kind: IndexKind,
}

impl IndexConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn build_unique(
        self,
        cache: Rc<dyn VolatileCache>,
        store: Rc<dyn PersistentStore>,
    ) -> Result<UniqueIndex, ConfigError> {
        match self.kind {
            IndexKind::Unique => Ok(UniqueIndex::new(cache, store, self.namespace, self.indexed)?),
            ref other => Err(self.mismatch("unique", other)),
        }
    }

    pub fn build_top_k(
        self,
        cache: Rc<dyn VolatileCache>,
        store: Rc<dyn PersistentStore>,
    ) -> Result<TopKIndex, ConfigError> {
        match self.kind {
            IndexKind::TopK(options) => Ok(TopKIndex::new(
                cache,
                store,
                self.namespace,
                self.indexed,
                options,
            )?),
            ref other => Err(self.mismatch("top_k", other)),
        }
    }

    fn mismatch(&self, expected: &'static str, found: &IndexKind) -> ConfigError {
        ConfigError::KindMismatch {
            prefix: self.namespace.prefix.clone(),
            expected,
            found: found.label(),
        }
    }
}

///
/// TESTS
///
