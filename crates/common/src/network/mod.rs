//! Peer registry and the discovery exchange format.
//!
//! Each node keeps a [`NetworkNodes`] registry mapping recipient public
//! keys to the URL of the node that holds them. Nodes exchange
//! [`PartyInfo`] snapshots; merging a snapshot only ever grows the registry,
//! so repeated, duplicated or reordered exchanges converge on the union of
//! what every node knows.

mod nodes;

pub use nodes::{NetworkNodes, RegistryError};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::crypto::PublicKey;

/// One registry entry on the wire. `url` is absent when the sender knows
/// the key but not yet where it lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyKey {
    pub key: PublicKey,
    pub url: Option<Url>,
}

/// Registry snapshot exchanged during discovery.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PartyInfo {
    /// URL of the node that produced the snapshot
    pub url: Option<Url>,
    /// Every node URL the sender knows, sorted
    pub node_urls: Vec<Url>,
    /// Key to URL mappings, sorted by key
    pub keys: Vec<PartyKey>,
}
