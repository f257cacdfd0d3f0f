//! The same contract exercised against every storage backend

use std::sync::Arc;

use ::common::crypto::{SecretKey, StorageKey};
use ::common::enclave::{Enclave, GroupType, PrivacyGroupPayload};
use ::common::storage::{KeyValueStore, StorageConfig};
use ::common::store::{PayloadStore, PrivacyGroupStore, Storage, StoreError};
use tempfile::TempDir;

fn backends(dir: &TempDir) -> Vec<StorageConfig> {
    vec![
        StorageConfig::Memory,
        StorageConfig::Sled {
            path: dir.path().join("sled"),
        },
        StorageConfig::Sql {
            path: dir.path().join("store.db"),
        },
    ]
}

async fn exercise_contract(store: Arc<dyn KeyValueStore>) {
    assert_eq!(store.get(b"missing").await.unwrap(), None);
    assert!(!store.contains(b"missing").await.unwrap());

    store.put(b"k", b"first".to_vec()).await.unwrap();
    assert_eq!(store.get(b"k").await.unwrap(), Some(b"first".to_vec()));
    store.put(b"k", b"second".to_vec()).await.unwrap();
    assert_eq!(store.get(b"k").await.unwrap(), Some(b"second".to_vec()));
    assert!(store.contains(b"k").await.unwrap());

    store.put(b"empty", Vec::new()).await.unwrap();
    assert_eq!(store.get(b"empty").await.unwrap(), Some(Vec::new()));

    store.remove(b"k").await.unwrap();
    store.remove(b"k").await.unwrap();
    assert_eq!(store.get(b"k").await.unwrap(), None);
}

#[tokio::test]
async fn test_every_backend_honors_the_contract() {
    let dir = TempDir::new().unwrap();
    for config in backends(&dir) {
        let store = config.open().await.unwrap();
        exercise_contract(store).await;
    }
}

#[tokio::test]
async fn test_backends_are_interchangeable() {
    let dir = TempDir::new().unwrap();
    let key = SecretKey::generate().unwrap();
    let public = key.public();
    let enclave = Arc::new(Enclave::new([key]).unwrap());
    let envelope = enclave.seal(b"same input", &public, &[public]).unwrap();
    let group = PrivacyGroupPayload::new([public], "g", "d", GroupType::Legacy, Some(vec![7; 8]));

    let mut payload_keys = Vec::new();
    let mut group_keys = Vec::new();
    for config in backends(&dir) {
        let store = config.open().await.unwrap();
        let payloads = PayloadStore::new(store.clone());
        let groups = PrivacyGroupStore::new(store, enclave.clone());

        let payload_key = payloads.put(&envelope).await.unwrap();
        assert_eq!(payloads.get(&payload_key).await.unwrap(), Some(envelope.clone()));
        payload_keys.push(payload_key);

        let group_key = groups.put(&group).await.unwrap();
        assert_eq!(groups.get(&group_key).await.unwrap(), Some(group.clone()));
        group_keys.push(group_key);
    }

    assert!(payload_keys.windows(2).all(|w| w[0] == w[1]));
    assert!(group_keys.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(group_keys[0], group.id().storage_key());
}

#[tokio::test]
async fn test_update_is_unimplemented_on_every_backend() {
    let dir = TempDir::new().unwrap();
    let key = SecretKey::generate().unwrap();
    let public = key.public();
    let enclave = Arc::new(Enclave::new([key]).unwrap());
    let envelope = enclave.seal(b"x", &public, &[public]).unwrap();

    for config in backends(&dir) {
        let payloads = PayloadStore::new(config.open().await.unwrap());
        let key = payloads.generate_digest(&envelope).unwrap();
        assert!(matches!(
            payloads.update(&key, &envelope).await,
            Err(StoreError::MethodUnimplemented)
        ));
        payloads.put(&envelope).await.unwrap();
        assert!(matches!(
            payloads.update(&key, &envelope).await,
            Err(StoreError::MethodUnimplemented)
        ));
    }
}

#[tokio::test]
async fn test_sql_backend_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let config: StorageConfig = format!("sql:{}", dir.path().join("store.db").display())
        .parse()
        .unwrap();
    let key = StorageKey::of(b"durable");
    {
        let store = config.open().await.unwrap();
        store.put(key.as_bytes(), b"durable".to_vec()).await.unwrap();
    }
    let reopened = config.open().await.unwrap();
    assert_eq!(
        reopened.get(key.as_bytes()).await.unwrap(),
        Some(b"durable".to_vec())
    );
}
