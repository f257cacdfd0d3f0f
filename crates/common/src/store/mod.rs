//! Typed, content-addressed facades over a [`KeyValueStore`].
//!
//! Values are immutable once written: the key is derived from the value, so
//! rewriting a key with different content would break the address. Both
//! stores therefore reject [`Storage::update`].

use async_trait::async_trait;

use crate::crypto::StorageKey;
use crate::storage::StorageError;

mod payload;
mod privacy_group;

pub use payload::PayloadStore;
pub use privacy_group::PrivacyGroupStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("stored value does not match the expected schema: {0}")]
    Deserialization(bincode::Error),
    #[error("failed to serialize value: {0}")]
    Serialization(bincode::Error),
    #[error("method unimplemented: stored values are immutable")]
    MethodUnimplemented,
}

/// Storage contract for one kind of value.
#[async_trait]
pub trait Storage<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    /// Persist `data` and return the key it was stored under
    async fn put(&self, data: &T) -> Result<StorageKey, StoreError>;

    /// Compute the key `data` is (or would be) stored under
    fn generate_digest(&self, data: &T) -> Result<StorageKey, StoreError>;

    async fn get(&self, key: &StorageKey) -> Result<Option<T>, StoreError>;

    async fn update(&self, _key: &StorageKey, _data: &T) -> Result<Option<T>, StoreError> {
        Err(StoreError::MethodUnimplemented)
    }
}

/// Logical table prefixes inside the shared key space.
pub(crate) mod table {
    pub const PAYLOAD: &[u8] = b"payload/";
    pub const PRIVACY_GROUP: &[u8] = b"group/";
    pub const REGISTRY: &[u8] = b"registry/";

    pub fn key(table: &[u8], key: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(table.len() + key.len());
        out.extend_from_slice(table);
        out.extend_from_slice(key);
        out
    }
}
