use std::sync::Arc;

use async_trait::async_trait;

use crate::crypto::StorageKey;
use crate::enclave::{Enclave, PrivacyGroupId, PrivacyGroupPayload};
use crate::storage::KeyValueStore;

use super::{table, Storage, StoreError};

/// Privacy group metadata keyed by the group's derived identifier.
///
/// The key is the group's semantic identity, so deleting a group rewrites
/// the same key with a DELETED state rather than removing it.
#[derive(Debug, Clone)]
pub struct PrivacyGroupStore {
    store: Arc<dyn KeyValueStore>,
    enclave: Arc<Enclave>,
}

impl PrivacyGroupStore {
    pub fn new(store: Arc<dyn KeyValueStore>, enclave: Arc<Enclave>) -> Self {
        Self { store, enclave }
    }

    pub async fn get_by_id(
        &self,
        id: &PrivacyGroupId,
    ) -> Result<Option<PrivacyGroupPayload>, StoreError> {
        self.get(&id.storage_key()).await
    }
}

#[async_trait]
impl Storage<PrivacyGroupPayload> for PrivacyGroupStore {
    async fn put(&self, data: &PrivacyGroupPayload) -> Result<StorageKey, StoreError> {
        let key = self.generate_digest(data)?;
        let bytes = bincode::serialize(data).map_err(StoreError::Serialization)?;
        self.store
            .put(&table::key(table::PRIVACY_GROUP, key.as_bytes()), bytes)
            .await?;
        tracing::debug!(group = %key, state = ?data.state, "stored privacy group");
        Ok(key)
    }

    fn generate_digest(&self, data: &PrivacyGroupPayload) -> Result<StorageKey, StoreError> {
        let id = self.enclave.derive_privacy_group_id(
            &data.addresses,
            data.random_seed.as_deref(),
            data.group_type,
        );
        Ok(id.storage_key())
    }

    async fn get(&self, key: &StorageKey) -> Result<Option<PrivacyGroupPayload>, StoreError> {
        self.store
            .get(&table::key(table::PRIVACY_GROUP, key.as_bytes()))
            .await?
            .map(|bytes| bincode::deserialize(&bytes).map_err(StoreError::Deserialization))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SecretKey;
    use crate::enclave::{GroupState, GroupType};
    use crate::storage::MemoryStore;

    fn store() -> (PrivacyGroupStore, Vec<crate::crypto::PublicKey>) {
        let keys: Vec<SecretKey> = (0..2).map(|_| SecretKey::generate().unwrap()).collect();
        let public = keys.iter().map(|k| k.public()).collect();
        let enclave = Arc::new(Enclave::new(keys).unwrap());
        (
            PrivacyGroupStore::new(Arc::new(MemoryStore::new()), enclave),
            public,
        )
    }

    #[tokio::test]
    async fn test_key_is_group_id() {
        let (store, k) = store();
        let group = PrivacyGroupPayload::new(
            k.clone(),
            "group",
            "desc",
            GroupType::Legacy,
            Some(b"seed".to_vec()),
        );
        let key = store.put(&group).await.unwrap();
        assert_eq!(key, group.id().storage_key());
        assert_eq!(store.get_by_id(&group.id()).await.unwrap(), Some(group));
    }

    #[tokio::test]
    async fn test_state_change_keeps_key() {
        let (store, k) = store();
        let group = PrivacyGroupPayload::new(k, "g", "", GroupType::Onchain, None);
        let key = store.put(&group).await.unwrap();
        let deleted_key = store.put(&group.clone().deleted()).await.unwrap();
        assert_eq!(key, deleted_key);
        let stored = store.get(&key).await.unwrap().unwrap();
        assert_eq!(stored.state, GroupState::Deleted);
    }

    #[tokio::test]
    async fn test_update_is_unimplemented() {
        let (store, k) = store();
        let group = PrivacyGroupPayload::implied(k);
        let key = store.put(&group).await.unwrap();
        assert!(matches!(
            store.update(&key, &group).await,
            Err(StoreError::MethodUnimplemented)
        ));
    }
}
