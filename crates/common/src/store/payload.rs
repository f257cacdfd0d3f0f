use std::sync::Arc;

use async_trait::async_trait;

use crate::crypto::StorageKey;
use crate::enclave::SealedEnvelope;
use crate::storage::KeyValueStore;

use super::{table, Storage, StoreError};

/// Sealed envelopes keyed by the digest of their canonical encoding.
#[derive(Debug, Clone)]
pub struct PayloadStore {
    store: Arc<dyn KeyValueStore>,
}

impl PayloadStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Storage<SealedEnvelope> for PayloadStore {
    async fn put(&self, data: &SealedEnvelope) -> Result<StorageKey, StoreError> {
        let bytes = data.to_bytes().map_err(StoreError::Serialization)?;
        let key = StorageKey::of(&bytes);
        self.store
            .put(&table::key(table::PAYLOAD, key.as_bytes()), bytes)
            .await?;
        tracing::debug!(key = %key, "stored sealed payload");
        Ok(key)
    }

    fn generate_digest(&self, data: &SealedEnvelope) -> Result<StorageKey, StoreError> {
        data.digest().map_err(StoreError::Serialization)
    }

    async fn get(&self, key: &StorageKey) -> Result<Option<SealedEnvelope>, StoreError> {
        self.store
            .get(&table::key(table::PAYLOAD, key.as_bytes()))
            .await?
            .map(|bytes| SealedEnvelope::from_bytes(&bytes).map_err(StoreError::Deserialization))
            .transpose()
    }
}
