use std::sync::Arc;

use tokio::sync::watch;
use url::Url;

use common::crypto::{PublicKey, SecretKey};
use common::enclave::{Enclave, EnclaveError};
use common::network::{NetworkNodes, RegistryError};
use common::node::{Node, PushProvider};
use common::storage::{KeyValueStore, StorageConfig, StorageError};

use crate::service_config::Config;

/// Main service state, shared by every HTTP handler and background task
#[derive(Debug, Clone)]
pub struct State {
    node: Node,
    store: Arc<dyn KeyValueStore>,
    registry_store: Arc<dyn KeyValueStore>,
    identity: PublicKey,
    shutdown_rx: watch::Receiver<()>,
}

/// Assembles a [`State`]. Only the keys are required; storage defaults to
/// memory and the node runs without a URL or peers.
#[derive(Debug)]
pub struct StateBuilder {
    keys: Vec<SecretKey>,
    storage: StorageConfig,
    known_nodes_storage: Option<StorageConfig>,
    node_url: Option<Url>,
    other_nodes: Vec<Url>,
    always_send_to: Vec<PublicKey>,
}

impl StateBuilder {
    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    pub fn known_nodes_storage(mut self, storage: StorageConfig) -> Self {
        self.known_nodes_storage = Some(storage);
        self
    }

    pub fn node_url(mut self, url: Url) -> Self {
        self.node_url = Some(url);
        self
    }

    pub fn other_nodes(mut self, urls: Vec<Url>) -> Self {
        self.other_nodes = urls;
        self
    }

    pub fn always_send_to(mut self, keys: Vec<PublicKey>) -> Self {
        self.always_send_to = keys;
        self
    }

    pub async fn build(
        self,
        push: Arc<dyn PushProvider>,
        shutdown_rx: watch::Receiver<()>,
    ) -> Result<State, StateSetupError> {
        // 1. Load keys into the enclave
        let enclave = Enclave::new(self.keys)?;
        let identity = enclave.default_key();
        let local_keys = enclave.public_keys();

        // 2. Open storage, once if both configs agree
        let store = self.storage.open().await?;
        let registry_store = match self.known_nodes_storage {
            Some(config) if config != self.storage => config.open().await?,
            _ => store.clone(),
        };

        // 3. Restore the registry and register ourselves
        let registry = NetworkNodes::restore(registry_store.as_ref(), &identity).await?;
        if let Some(url) = self.node_url {
            registry.set_node_url(url, &local_keys);
        }
        for url in self.other_nodes {
            registry.add_node_url(url);
        }
        tracing::info!(
            identity = %identity,
            keys = local_keys.len(),
            known_keys = registry.len(),
            node_url = ?registry.node_url(),
            "service state ready"
        );

        // 4. Compose the node
        let node = Node::builder(Arc::new(enclave))
            .with_store(store.clone())
            .with_registry(Arc::new(registry))
            .with_push_provider(push)
            .with_always_send_to(self.always_send_to)
            .build();

        Ok(State {
            node,
            store,
            registry_store,
            identity,
            shutdown_rx,
        })
    }
}

impl State {
    pub fn builder(keys: Vec<SecretKey>) -> StateBuilder {
        StateBuilder {
            keys,
            storage: StorageConfig::Memory,
            known_nodes_storage: None,
            node_url: None,
            other_nodes: Vec::new(),
            always_send_to: Vec::new(),
        }
    }

    pub async fn from_config(
        config: &Config,
        push: Arc<dyn PushProvider>,
        shutdown_rx: watch::Receiver<()>,
    ) -> Result<Self, StateSetupError> {
        Self::builder(config.keys.clone())
            .storage(config.storage.clone())
            .known_nodes_storage(config.known_nodes_storage.clone())
            .node_url(config.node_url.clone())
            .other_nodes(config.other_nodes.clone())
            .always_send_to(config.always_send_to.clone())
            .build(push, shutdown_rx)
            .await
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// The node's default public key
    pub fn identity(&self) -> &PublicKey {
        &self.identity
    }

    /// Whether a shutdown has been signalled
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_rx.has_changed().unwrap_or(false)
    }

    /// Save the registry snapshot under our identity
    pub async fn persist_registry(&self) -> Result<(), RegistryError> {
        self.node
            .registry()
            .persist(self.registry_store.as_ref(), &self.identity)
            .await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("enclave error: {0}")]
    Enclave(#[from] EnclaveError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::node::NoopPushProvider;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_registry_survives_restart() {
        let dir = TempDir::new().unwrap();
        let key = SecretKey::generate().unwrap();
        let url = Url::parse("http://127.0.0.1:9001/").unwrap();
        let peer = Url::parse("http://10.0.0.2:8080/").unwrap();
        let storage = StorageConfig::Sql {
            path: dir.path().join("store.db"),
        };
        let (_tx, rx) = watch::channel(());

        {
            let state = State::builder(vec![key.clone()])
                .storage(storage.clone())
                .node_url(url.clone())
                .other_nodes(vec![peer.clone()])
                .build(Arc::new(NoopPushProvider), rx.clone())
                .await
                .unwrap();
            state.persist_registry().await.unwrap();
        }

        let state = State::builder(vec![key.clone()])
            .storage(storage)
            .build(Arc::new(NoopPushProvider), rx)
            .await
            .unwrap();
        let registry = state.node().registry();
        assert_eq!(registry.node_url(), Some(url.clone()));
        assert_eq!(registry.resolve(&key.public()), Some(url));
        assert!(registry.node_urls().contains(&peer));
    }

    #[tokio::test]
    async fn test_restart_on_new_url_forgets_old_one() {
        let dir = TempDir::new().unwrap();
        let key = SecretKey::generate().unwrap();
        let old = Url::parse("http://127.0.0.1:9001/").unwrap();
        let new = Url::parse("http://127.0.0.1:9002/").unwrap();
        let storage = StorageConfig::Sql {
            path: dir.path().join("store.db"),
        };
        let (_tx, rx) = watch::channel(());

        {
            let state = State::builder(vec![key.clone()])
                .storage(storage.clone())
                .node_url(old.clone())
                .build(Arc::new(NoopPushProvider), rx.clone())
                .await
                .unwrap();
            state.persist_registry().await.unwrap();
        }

        let state = State::builder(vec![key.clone()])
            .storage(storage)
            .node_url(new.clone())
            .build(Arc::new(NoopPushProvider), rx)
            .await
            .unwrap();
        let registry = state.node().registry();
        assert_eq!(registry.node_urls(), vec![new.clone()]);
        assert!(registry.peer_urls().is_empty());
        assert_eq!(registry.resolve(&key.public()), Some(new));
    }

    #[tokio::test]
    async fn test_shutdown_signal_is_visible() {
        let (tx, rx) = watch::channel(());
        let state = State::builder(vec![SecretKey::generate().unwrap()])
            .build(Arc::new(NoopPushProvider), rx)
            .await
            .unwrap();
        assert!(!state.is_shutting_down());
        tx.send(()).unwrap();
        assert!(state.is_shutting_down());
    }
}
