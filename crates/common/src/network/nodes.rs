use std::collections::{BTreeMap, BTreeSet};

use parking_lot::RwLock;
use url::Url;

use crate::crypto::PublicKey;
use crate::storage::{KeyValueStore, StorageError};
use crate::store::table;

use super::{PartyInfo, PartyKey};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("registry snapshot is corrupt: {0}")]
    Deserialization(bincode::Error),
    #[error("failed to serialize registry snapshot: {0}")]
    Serialization(bincode::Error),
}

#[derive(Debug, Default)]
struct Inner {
    node_url: Option<Url>,
    node_urls: BTreeSet<Url>,
    node_pks: BTreeMap<PublicKey, Option<Url>>,
}

impl Inner {
    /// Insert `url` for `key` if the key is unknown or its mapping is unset.
    fn merge_entry(&mut self, key: PublicKey, url: Option<Url>) -> bool {
        match self.node_pks.get_mut(&key) {
            None => {
                self.node_pks.insert(key, url);
                true
            }
            Some(existing) if existing.is_none() && url.is_some() => {
                *existing = url;
                true
            }
            Some(_) => false,
        }
    }
}

/// Shared registry of public key to node URL mappings.
///
/// All methods take `&self`; a single lock guards the maps so concurrent
/// discovery responses and local registrations never interleave mid-merge.
#[derive(Debug, Default)]
pub struct NetworkNodes {
    inner: RwLock<Inner>,
}

impl NetworkNodes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from a snapshot, including its node URL.
    pub fn from_snapshot(info: &PartyInfo) -> Self {
        let nodes = Self::new();
        nodes.inner.write().node_url = info.url.clone();
        nodes.merge_party_info(info);
        nodes
    }

    /// Record our own URL and map each local key to it. A previous own URL
    /// is forgotten so it is never contacted as a peer.
    pub fn set_node_url(&self, url: Url, local_keys: &[PublicKey]) {
        let mut inner = self.inner.write();
        if let Some(previous) = inner.node_url.take() {
            if previous != url {
                inner.node_urls.remove(&previous);
            }
        }
        inner.node_urls.insert(url.clone());
        for key in local_keys {
            inner.node_pks.insert(*key, Some(url.clone()));
        }
        inner.node_url = Some(url);
    }

    pub fn node_url(&self) -> Option<Url> {
        self.inner.read().node_url.clone()
    }

    /// Remember a node URL without any keys, e.g. a bootstrap peer.
    pub fn add_node_url(&self, url: Url) -> bool {
        self.inner.write().node_urls.insert(url)
    }

    /// Insert or overwrite mappings. Keys absent from `entries` are left
    /// alone, so this path only grows the registry.
    pub fn add_node(&self, entries: impl IntoIterator<Item = (PublicKey, Url)>) {
        let mut inner = self.inner.write();
        for (key, url) in entries {
            inner.node_urls.insert(url.clone());
            inner.node_pks.insert(key, Some(url));
        }
    }

    /// Merge another registry into this one. Returns whether anything changed.
    ///
    /// Existing mappings win, so merges commute only while both sides agree
    /// on every shared key's URL. When they disagree the receiver keeps its
    /// own mapping and the result depends on merge order.
    pub fn merge(&self, other: &NetworkNodes) -> bool {
        let snapshot = other.snapshot();
        self.merge_party_info(&snapshot)
    }

    /// Merge a discovery snapshot.
    ///
    /// Unknown keys are added. A known key only takes the incoming URL when
    /// its own mapping is unset; established mappings are never replaced and
    /// an empty URL never erases one.
    pub fn merge_party_info(&self, info: &PartyInfo) -> bool {
        let mut inner = self.inner.write();
        let mut changed = false;
        for url in info.url.iter().chain(info.node_urls.iter()) {
            changed |= inner.node_urls.insert(url.clone());
        }
        for PartyKey { key, url } in &info.keys {
            if let Some(url) = url {
                changed |= inner.node_urls.insert(url.clone());
            }
            changed |= inner.merge_entry(*key, url.clone());
        }
        changed
    }

    pub fn resolve(&self, key: &PublicKey) -> Option<Url> {
        self.inner.read().node_pks.get(key).cloned().flatten()
    }

    /// Every known node URL, ours included.
    pub fn node_urls(&self) -> Vec<Url> {
        self.inner.read().node_urls.iter().cloned().collect()
    }

    /// Known node URLs other than our own.
    pub fn peer_urls(&self) -> Vec<Url> {
        let inner = self.inner.read();
        inner
            .node_urls
            .iter()
            .filter(|url| Some(*url) != inner.node_url.as_ref())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().node_pks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> PartyInfo {
        let inner = self.inner.read();
        PartyInfo {
            url: inner.node_url.clone(),
            node_urls: inner.node_urls.iter().cloned().collect(),
            keys: inner
                .node_pks
                .iter()
                .map(|(key, url)| PartyKey {
                    key: *key,
                    url: url.clone(),
                })
                .collect(),
        }
    }

    fn storage_key(identity: &PublicKey) -> Vec<u8> {
        table::key(table::REGISTRY, identity.to_base64().as_bytes())
    }

    /// Save a snapshot keyed by the local node identity.
    pub async fn persist(
        &self,
        store: &dyn KeyValueStore,
        identity: &PublicKey,
    ) -> Result<(), RegistryError> {
        let bytes = bincode::serialize(&self.snapshot()).map_err(RegistryError::Serialization)?;
        store.put(&Self::storage_key(identity), bytes).await?;
        Ok(())
    }

    /// Load the snapshot saved by [`NetworkNodes::persist`], or an empty
    /// registry if none exists.
    pub async fn restore(
        store: &dyn KeyValueStore,
        identity: &PublicKey,
    ) -> Result<Self, RegistryError> {
        match store.get(&Self::storage_key(identity)).await? {
            Some(bytes) => {
                let info: PartyInfo =
                    bincode::deserialize(&bytes).map_err(RegistryError::Deserialization)?;
                tracing::debug!(keys = info.keys.len(), "restored registry snapshot");
                Ok(Self::from_snapshot(&info))
            }
            None => Ok(Self::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SecretKey;
    use crate::storage::MemoryStore;

    fn key() -> PublicKey {
        SecretKey::generate().unwrap().public()
    }

    fn url(port: u16) -> Url {
        Url::parse(&format!("http://127.0.0.1:{}/", port)).unwrap()
    }

    #[test]
    fn test_add_node_overwrites_and_never_removes() {
        let nodes = NetworkNodes::new();
        let (a, b) = (key(), key());
        nodes.add_node([(a, url(1)), (b, url(2))]);
        nodes.add_node([(a, url(3))]);
        assert_eq!(nodes.resolve(&a), Some(url(3)));
        assert_eq!(nodes.resolve(&b), Some(url(2)));
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn test_merge_keeps_established_mapping() {
        let nodes = NetworkNodes::new();
        let a = key();
        nodes.add_node([(a, url(1))]);

        let stale = PartyInfo {
            url: Some(url(9)),
            node_urls: vec![],
            keys: vec![PartyKey {
                key: a,
                url: Some(url(2)),
            }],
        };
        nodes.merge_party_info(&stale);
        assert_eq!(nodes.resolve(&a), Some(url(1)));
        assert!(nodes.node_urls().contains(&url(9)));
    }

    #[test]
    fn test_merge_fills_unset_and_never_erases() {
        let nodes = NetworkNodes::new();
        let (a, b) = (key(), key());
        nodes.add_node([(b, url(2))]);
        let partial = PartyInfo {
            url: None,
            node_urls: vec![],
            keys: vec![
                PartyKey { key: a, url: None },
                PartyKey { key: b, url: None },
            ],
        };
        assert!(nodes.merge_party_info(&partial));
        assert_eq!(nodes.resolve(&a), None);
        assert_eq!(nodes.resolve(&b), Some(url(2)));

        let filled = PartyInfo {
            url: None,
            node_urls: vec![],
            keys: vec![PartyKey {
                key: a,
                url: Some(url(1)),
            }],
        };
        assert!(nodes.merge_party_info(&filled));
        assert_eq!(nodes.resolve(&a), Some(url(1)));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let nodes = NetworkNodes::new();
        nodes.set_node_url(url(1), &[key()]);
        nodes.add_node([(key(), url(2))]);
        let before = nodes.snapshot();
        assert!(!nodes.merge(&nodes));
        assert_eq!(nodes.snapshot(), before);
    }

    #[test]
    fn test_merge_is_commutative() {
        let shared = key();
        let a = NetworkNodes::new();
        a.add_node([(key(), url(1)), (shared, url(3))]);
        let b = NetworkNodes::new();
        b.add_node([(key(), url(2)), (shared, url(3))]);

        let ab = NetworkNodes::new();
        ab.merge(&a);
        ab.merge(&b);
        let ba = NetworkNodes::new();
        ba.merge(&b);
        ba.merge(&a);

        assert_eq!(ab.snapshot(), ba.snapshot());
        assert_eq!(ab.len(), 3);
    }

    #[test]
    fn test_merge_order_decides_conflicting_url() {
        let shared = key();
        let a = NetworkNodes::new();
        a.add_node([(shared, url(1))]);
        let b = NetworkNodes::new();
        b.add_node([(shared, url(2))]);

        let ab = NetworkNodes::new();
        ab.merge(&a);
        ab.merge(&b);
        let ba = NetworkNodes::new();
        ba.merge(&b);
        ba.merge(&a);

        assert_eq!(ab.resolve(&shared), Some(url(1)));
        assert_eq!(ba.resolve(&shared), Some(url(2)));
        assert_ne!(ab.snapshot(), ba.snapshot());
        // Both URLs are still known as nodes
        assert_eq!(ab.node_urls(), ba.node_urls());
    }

    #[test]
    fn test_changed_node_url_drops_previous() {
        let nodes = NetworkNodes::new();
        let me = key();
        nodes.set_node_url(url(1), &[me]);
        nodes.add_node_url(url(3));
        nodes.set_node_url(url(2), &[me]);

        assert_eq!(nodes.node_urls(), vec![url(2), url(3)]);
        assert_eq!(nodes.peer_urls(), vec![url(3)]);
        assert_eq!(nodes.resolve(&me), Some(url(2)));

        nodes.set_node_url(url(2), &[me]);
        assert_eq!(nodes.node_urls(), vec![url(2), url(3)]);
    }

    #[test]
    fn test_peer_urls_exclude_self() {
        let nodes = NetworkNodes::new();
        nodes.set_node_url(url(1), &[key()]);
        nodes.add_node_url(url(2));
        assert_eq!(nodes.node_urls(), vec![url(1), url(2)]);
        assert_eq!(nodes.peer_urls(), vec![url(2)]);
    }

    #[tokio::test]
    async fn test_persist_and_restore() {
        let store = MemoryStore::new();
        let me = key();
        let nodes = NetworkNodes::new();
        nodes.set_node_url(url(1), &[me]);
        nodes.add_node([(key(), url(2))]);
        nodes.persist(&store, &me).await.unwrap();

        let restored = NetworkNodes::restore(&store, &me).await.unwrap();
        assert_eq!(restored.snapshot(), nodes.snapshot());

        let empty = NetworkNodes::restore(&store, &key()).await.unwrap();
        assert!(empty.is_empty());
    }
}
