use std::path::PathBuf;

use async_trait::async_trait;

use super::{KeyValueStore, StorageError};

/// Tree holding every key of the store.
const STORE_TREE: &str = "hush_store";

/// Durable store on top of the sled embedded database.
///
/// sled calls block on disk I/O, so each operation runs on the blocking
/// thread pool. sled serializes writers internally and a reader sees either
/// the previous or the complete new value.
#[derive(Debug, Clone)]
pub struct SledStore {
    db: sled::Db,
    tree: sled::Tree,
}

impl SledStore {
    /// Open or create the database directory at `path`.
    pub async fn open(path: PathBuf) -> Result<Self, StorageError> {
        tokio::task::spawn_blocking(move || {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(StorageError::unavailable)?;
            }
            let db = sled::Config::new()
                .path(&path)
                .mode(sled::Mode::HighThroughput)
                .flush_every_ms(Some(500))
                .open()
                .map_err(|e| StorageError::unavailable(format!("sled open: {}", e)))?;
            let tree = db
                .open_tree(STORE_TREE)
                .map_err(|e| StorageError::unavailable(format!("open store tree: {}", e)))?;
            tracing::debug!(path = %path.display(), entries = tree.len(), "sled store opened");
            Ok(Self { db, tree })
        })
        .await
        .map_err(StorageError::unavailable)?
    }

    /// Flush dirty pages to disk
    pub async fn flush(&self) -> Result<(), StorageError> {
        self.db
            .flush_async()
            .await
            .map_err(|e| StorageError::unavailable(format!("flush: {}", e)))?;
        Ok(())
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(sled::Tree) -> sled::Result<T> + Send + 'static,
    {
        let tree = self.tree.clone();
        tokio::task::spawn_blocking(move || op(tree))
            .await
            .map_err(StorageError::unavailable)?
            .map_err(StorageError::unavailable)
    }
}

#[async_trait]
impl KeyValueStore for SledStore {
    async fn put(&self, key: &[u8], value: Vec<u8>) -> Result<(), StorageError> {
        let key = key.to_vec();
        self.blocking(move |tree| tree.insert(key, value).map(|_| ()))
            .await
    }

    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let key = key.to_vec();
        self.blocking(move |tree| tree.get(key).map(|v| v.map(|ivec| ivec.to_vec())))
            .await
    }

    async fn remove(&self, key: &[u8]) -> Result<(), StorageError> {
        let key = key.to_vec();
        self.blocking(move |tree| tree.remove(key).map(|_| ()))
            .await
    }

    async fn contains(&self, key: &[u8]) -> Result<bool, StorageError> {
        let key = key.to_vec();
        self.blocking(move |tree| tree.contains_key(key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_sled_put_get_remove() {
        let dir = TempDir::new().unwrap();
        let store = SledStore::open(dir.path().join("store")).await.unwrap();

        assert_eq!(store.get(b"missing").await.unwrap(), None);
        store.put(b"k", b"v".to_vec()).await.unwrap();
        assert_eq!(store.get(b"k").await.unwrap(), Some(b"v".to_vec()));
        assert!(store.contains(b"k").await.unwrap());

        store.remove(b"k").await.unwrap();
        assert!(!store.contains(b"k").await.unwrap());
    }

    #[tokio::test]
    async fn test_sled_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store");
        {
            let store = SledStore::open(path.clone()).await.unwrap();
            store.put(b"durable", b"yes".to_vec()).await.unwrap();
            store.flush().await.unwrap();
        }
        let store = SledStore::open(path).await.unwrap();
        assert_eq!(store.get(b"durable").await.unwrap(), Some(b"yes".to_vec()));
    }
}
