//! Send, receive and privacy group flows.
//!
//! A [`Node`] composes the enclave, the two content-addressed stores, the
//! peer registry and a push provider. Every dependency is passed in at
//! construction; there is no process global state.

use std::collections::BTreeSet;
use std::sync::Arc;

use url::Url;

use crate::crypto::{PublicKey, Secret, SecretError, StorageKey};
use crate::enclave::{
    Enclave, EnclaveError, GroupType, PrivacyGroupId, PrivacyGroupPayload, SealedEnvelope,
};
use crate::network::NetworkNodes;
use crate::storage::{KeyValueStore, MemoryStore};
use crate::store::{PayloadStore, PrivacyGroupStore, Storage, StoreError};

mod messages;
mod push;

pub use messages::{CreatePrivacyGroup, ReceiveResponse, Recipients, SendRequest, SendResponse};
pub use push::{NoopPushProvider, PushJob, PushProvider};

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error(transparent)]
    Enclave(#[from] EnclaveError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("crypto error: {0}")]
    Crypto(#[from] SecretError),
    #[error("payload not found: {0}")]
    PayloadNotFound(StorageKey),
    #[error("privacy group not found: {0}")]
    GroupNotFound(PrivacyGroupId),
    #[error("privacy group has been deleted: {0}")]
    GroupDeleted(PrivacyGroupId),
    #[error("{key} is not a member of privacy group {group}")]
    NotAMember {
        key: PublicKey,
        group: PrivacyGroupId,
    },
    #[error("pushed payload digest {actual} does not match advertised key {expected}")]
    DigestMismatch {
        expected: StorageKey,
        actual: StorageKey,
    },
}

/// Builder for a [`Node`]. Only the enclave is required.
#[derive(Debug)]
pub struct NodeBuilder {
    enclave: Arc<Enclave>,
    store: Option<Arc<dyn KeyValueStore>>,
    registry: Option<Arc<NetworkNodes>>,
    push: Option<Arc<dyn PushProvider>>,
    always_send_to: Vec<PublicKey>,
}

impl NodeBuilder {
    pub fn new(enclave: Arc<Enclave>) -> Self {
        Self {
            enclave,
            store: None,
            registry: None,
            push: None,
            always_send_to: Vec::new(),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_registry(mut self, registry: Arc<NetworkNodes>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_push_provider(mut self, push: Arc<dyn PushProvider>) -> Self {
        self.push = Some(push);
        self
    }

    /// Keys added to the recipients of every direct send
    pub fn with_always_send_to(mut self, keys: Vec<PublicKey>) -> Self {
        self.always_send_to = keys;
        self
    }

    pub fn build(self) -> Node {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn KeyValueStore>);
        Node {
            payloads: PayloadStore::new(store.clone()),
            groups: PrivacyGroupStore::new(store, self.enclave.clone()),
            enclave: self.enclave,
            registry: self.registry.unwrap_or_default(),
            push: self
                .push
                .unwrap_or_else(|| Arc::new(NoopPushProvider) as Arc<dyn PushProvider>),
            always_send_to: self.always_send_to,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    enclave: Arc<Enclave>,
    payloads: PayloadStore,
    groups: PrivacyGroupStore,
    registry: Arc<NetworkNodes>,
    push: Arc<dyn PushProvider>,
    always_send_to: Vec<PublicKey>,
}

impl Node {
    pub fn builder(enclave: Arc<Enclave>) -> NodeBuilder {
        NodeBuilder::new(enclave)
    }

    pub fn enclave(&self) -> &Arc<Enclave> {
        &self.enclave
    }

    pub fn registry(&self) -> &Arc<NetworkNodes> {
        &self.registry
    }

    pub fn payloads(&self) -> &PayloadStore {
        &self.payloads
    }

    pub fn groups(&self) -> &PrivacyGroupStore {
        &self.groups
    }

    /// Seal, store and propagate a payload.
    ///
    /// The sender is always a recipient so it can read its own payload. A
    /// direct send stores the implied seedless LEGACY group for the final
    /// recipient set and returns its id; every participant derives the same
    /// id from the membership alone.
    ///
    /// Propagation is best effort: recipients the registry cannot resolve
    /// are skipped and dispatch failures are logged. The send succeeds once
    /// the payload is stored locally.
    pub async fn send(&self, request: SendRequest) -> Result<SendResponse, NodeError> {
        let from = request.from.unwrap_or_else(|| self.enclave.default_key());

        let group = match request.to {
            Recipients::Keys(keys) => {
                let mut recipients: BTreeSet<PublicKey> = keys.into_iter().collect();
                recipients.extend(self.always_send_to.iter().copied());
                recipients.insert(from);
                let group = PrivacyGroupPayload::implied(recipients);
                self.ensure_group(&group).await?;
                group
            }
            Recipients::PrivacyGroup(id) => {
                let group = self.active_group(&id).await?;
                if !group.contains(&from) {
                    return Err(NodeError::NotAMember {
                        key: from,
                        group: id,
                    });
                }
                group
            }
        };

        let group_id = group.id();
        let envelope = self
            .enclave
            .seal(&request.payload, &from, &group.addresses)?
            .with_privacy_group(group_id);
        let key = self.payloads.put(&envelope).await?;
        tracing::info!(
            key = %key,
            group = %group_id,
            recipients = group.addresses.len(),
            "payload sealed and stored"
        );

        for url in self.remote_urls(&group.addresses) {
            self.dispatch(PushJob::Payload {
                url,
                key: key.clone(),
                envelope: envelope.clone(),
            })
            .await;
        }

        Ok(SendResponse {
            key,
            privacy_group_id: group_id,
        })
    }

    /// Unseal a stored payload as `to` (defaults to the node's key).
    pub async fn receive(
        &self,
        key: &StorageKey,
        to: Option<PublicKey>,
    ) -> Result<ReceiveResponse, NodeError> {
        let to = to.unwrap_or_else(|| self.enclave.default_key());
        let envelope = self
            .payloads
            .get(key)
            .await?
            .ok_or_else(|| NodeError::PayloadNotFound(key.clone()))?;
        let payload = self.enclave.unseal(&envelope, &to)?;
        Ok(ReceiveResponse {
            payload,
            privacy_group_id: envelope.privacy_group_id,
        })
    }

    /// Store a payload pushed by a peer. The advertised key must equal the
    /// digest we compute, so a peer cannot plant content under a foreign key.
    pub async fn store_pushed(
        &self,
        key: &StorageKey,
        envelope: &SealedEnvelope,
    ) -> Result<StorageKey, NodeError> {
        let actual = self.payloads.generate_digest(envelope)?;
        if actual != *key {
            return Err(NodeError::DigestMismatch {
                expected: key.clone(),
                actual,
            });
        }
        let stored = self.payloads.put(envelope).await?;
        tracing::debug!(key = %stored, "stored pushed payload");
        Ok(stored)
    }

    /// Create a privacy group. The creator is always a member; LEGACY groups
    /// without a seed get a random one. Creating a group whose id is already
    /// stored returns the stored record unchanged.
    pub async fn create_privacy_group(
        &self,
        request: CreatePrivacyGroup,
    ) -> Result<PrivacyGroupPayload, NodeError> {
        let from = request.from.unwrap_or_else(|| self.enclave.default_key());
        let random_seed = match (request.group_type, request.random_seed) {
            (GroupType::Legacy, None) => Some(Secret::generate()?.bytes().to_vec()),
            (_, seed) => seed,
        };
        let group = PrivacyGroupPayload::new(
            request.addresses.into_iter().chain([from]),
            request.name,
            request.description,
            request.group_type,
            random_seed,
        );
        let id = group.id();

        if let Some(existing) = self.groups.get_by_id(&id).await? {
            if !existing.is_active() {
                return Err(NodeError::GroupDeleted(id));
            }
            tracing::debug!(group = %id, "privacy group already exists");
            return Ok(existing);
        }

        self.groups.put(&group).await?;
        tracing::info!(group = %id, members = group.addresses.len(), "privacy group created");
        self.share_group(&group).await;
        Ok(group)
    }

    pub async fn find_privacy_group(
        &self,
        id: &PrivacyGroupId,
    ) -> Result<Option<PrivacyGroupPayload>, NodeError> {
        Ok(self.groups.get_by_id(id).await?)
    }

    /// Mark a group DELETED. The metadata is kept under the same id.
    /// Deleting an already deleted group returns it unchanged.
    pub async fn delete_privacy_group(
        &self,
        id: &PrivacyGroupId,
        from: Option<PublicKey>,
    ) -> Result<PrivacyGroupPayload, NodeError> {
        let from = from.unwrap_or_else(|| self.enclave.default_key());
        let group = self
            .groups
            .get_by_id(id)
            .await?
            .ok_or(NodeError::GroupNotFound(*id))?;
        if !group.contains(&from) {
            return Err(NodeError::NotAMember {
                key: from,
                group: *id,
            });
        }
        if !group.is_active() {
            return Ok(group);
        }

        let deleted = group.deleted();
        self.groups.put(&deleted).await?;
        tracing::info!(group = %id, "privacy group deleted");
        self.share_group(&deleted).await;
        Ok(deleted)
    }

    /// Store group metadata pushed by a peer.
    ///
    /// Stored groups are immutable: an unseen id is stored, and a stored
    /// ACTIVE group only ever moves to DELETED. Anything else is ignored.
    pub async fn store_pushed_privacy_group(
        &self,
        group: &PrivacyGroupPayload,
    ) -> Result<PrivacyGroupId, NodeError> {
        let group = group.clone().normalized();
        let id = group.id();
        match self.groups.get_by_id(&id).await? {
            None => {
                self.groups.put(&group).await?;
            }
            Some(existing) if existing.is_active() && !group.is_active() => {
                self.groups.put(&existing.deleted()).await?;
                tracing::debug!(group = %id, "pushed deletion of privacy group");
            }
            Some(_) => {
                tracing::debug!(group = %id, "privacy group already stored, ignoring push");
            }
        }
        Ok(id)
    }

    async fn active_group(&self, id: &PrivacyGroupId) -> Result<PrivacyGroupPayload, NodeError> {
        let group = self
            .groups
            .get_by_id(id)
            .await?
            .ok_or(NodeError::GroupNotFound(*id))?;
        if !group.is_active() {
            return Err(NodeError::GroupDeleted(*id));
        }
        Ok(group)
    }

    /// Store an implied group the first time it is seen.
    async fn ensure_group(&self, group: &PrivacyGroupPayload) -> Result<(), NodeError> {
        if self.groups.get_by_id(&group.id()).await?.is_none() {
            self.groups.put(group).await?;
            self.share_group(group).await;
        }
        Ok(())
    }

    async fn share_group(&self, group: &PrivacyGroupPayload) {
        for url in self.remote_urls(&group.addresses) {
            self.dispatch(PushJob::PrivacyGroup {
                url,
                group: group.clone(),
            })
            .await;
        }
    }

    /// Distinct node URLs for the recipients we do not hold ourselves.
    fn remote_urls(&self, recipients: &[PublicKey]) -> BTreeSet<Url> {
        let own = self.registry.node_url();
        recipients
            .iter()
            .filter(|key| !self.enclave.holds(key))
            .filter_map(|key| {
                let url = self.registry.resolve(key);
                if url.is_none() {
                    tracing::warn!(recipient = %key, "no known node for recipient, skipping push");
                }
                url
            })
            .filter(|url| Some(url) != own.as_ref())
            .collect()
    }

    async fn dispatch(&self, job: PushJob) {
        let url = job.url().clone();
        if let Err(e) = self.push.dispatch(job).await {
            tracing::warn!(url = %url, "failed to dispatch push: {}", e);
        }
    }
}
