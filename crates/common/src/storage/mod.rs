//! Pluggable asynchronous key/value persistence.
//!
//! Three backends satisfy the same [`KeyValueStore`] contract:
//!
//! - [`MemoryStore`]: volatile map, lives as long as the process
//! - [`SledStore`]: embedded on-disk log structured store
//! - [`SqlStore`]: one row per key in a SQLite table
//!
//! A `get` for a missing key is `Ok(None)`. Backend failures surface as
//! [`StorageError::Unavailable`] so callers can tell "down" from "absent".

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod memory;
mod sled_backend;
mod sql;

pub use memory::MemoryStore;
pub use sled_backend::SledStore;
pub use sql::SqlStore;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Backend I/O failure. Retriable.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub(crate) fn unavailable(e: impl fmt::Display) -> Self {
        StorageError::Unavailable(e.to_string())
    }
}

/// Asynchronous key/value contract shared by every backend.
///
/// Implementations must never block the calling task. A `get` that follows a
/// completed `put` of the same key observes the written value.
#[async_trait]
pub trait KeyValueStore: Send + Sync + fmt::Debug + 'static {
    async fn put(&self, key: &[u8], value: Vec<u8>) -> Result<(), StorageError>;

    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &[u8]) -> Result<(), StorageError>;

    async fn contains(&self, key: &[u8]) -> Result<bool, StorageError> {
        Ok(self.get(key).await?.is_some())
    }
}

/// Which backend to open.
///
/// In `config.toml` this is a tagged table:
///
/// ```toml
/// [storage]
/// type = "sled"
/// path = "data/store"
/// ```
///
/// On the command line the compact forms `memory`, `sled:<path>` and
/// `sql:<path>` are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageConfig {
    #[default]
    Memory,
    Sled {
        path: PathBuf,
    },
    Sql {
        path: PathBuf,
    },
}

impl StorageConfig {
    /// Resolve relative paths against `base`
    pub fn rooted_at(self, base: &std::path::Path) -> Self {
        match self {
            StorageConfig::Memory => StorageConfig::Memory,
            StorageConfig::Sled { path } if path.is_relative() => StorageConfig::Sled {
                path: base.join(path),
            },
            StorageConfig::Sql { path } if path.is_relative() => StorageConfig::Sql {
                path: base.join(path),
            },
            other => other,
        }
    }

    pub async fn open(&self) -> Result<Arc<dyn KeyValueStore>, StorageError> {
        tracing::info!(storage = %self, "opening storage backend");
        Ok(match self {
            StorageConfig::Memory => Arc::new(MemoryStore::new()),
            StorageConfig::Sled { path } => Arc::new(SledStore::open(path.clone()).await?),
            StorageConfig::Sql { path } => Arc::new(SqlStore::open(path).await?),
        })
    }
}

impl fmt::Display for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageConfig::Memory => f.write_str("memory"),
            StorageConfig::Sled { path } => write!(f, "sled:{}", path.display()),
            StorageConfig::Sql { path } => write!(f, "sql:{}", path.display()),
        }
    }
}

impl FromStr for StorageConfig {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, path) = match s.split_once(':') {
            Some((kind, path)) => (kind, Some(path)),
            None => (s, None),
        };
        match (kind, path) {
            ("memory", None) => Ok(StorageConfig::Memory),
            ("sled", Some(path)) if !path.is_empty() => Ok(StorageConfig::Sled {
                path: PathBuf::from(path),
            }),
            ("sql", Some(path)) if !path.is_empty() => Ok(StorageConfig::Sql {
                path: PathBuf::from(path),
            }),
            _ => Err(format!(
                "invalid storage '{}', expected memory, sled:<path> or sql:<path>",
                s
            )),
        }
    }
}
