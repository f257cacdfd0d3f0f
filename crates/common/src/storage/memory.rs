use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::{KeyValueStore, StorageError};

/// In-memory store backed by a HashMap. Contents are lost on drop.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<Vec<u8>, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|map| map.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::unavailable(format!("failed to acquire lock: {}", e))
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn put(&self, key: &[u8], value: Vec<u8>) -> Result<(), StorageError> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        inner.insert(key.to_vec(), value);
        Ok(())
    }

    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.get(key).cloned())
    }

    async fn remove(&self, key: &[u8]) -> Result<(), StorageError> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        inner.remove(key);
        Ok(())
    }
}
