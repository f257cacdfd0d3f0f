/**
 * Cryptographic primitives.
 *  - X25519 key pairs
 *  - Symmetric payload secrets
 *  - Content digests used as storage keys
 */
pub mod crypto;
/**
 * Sole holder of private keys. Seals payloads
 *  for a set of recipients, unseals them for
 *  a held key and derives privacy group ids.
 */
pub mod enclave;
/**
 * Peer registry: which node URL serves
 *  which public key, and the party info
 *  exchanged during discovery.
 */
pub mod network;
/**
 * Send, receive and privacy group flows
 *  composed over the enclave, the stores
 *  and the registry.
 */
pub mod node;
/**
 * Pluggable async key/value backends.
 */
pub mod storage;
/**
 * Content-addressed typed stores for sealed
 *  payloads and privacy group metadata.
 */
pub mod store;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::crypto::{PublicKey, SecretKey, StorageKey};
    pub use crate::enclave::{
        Enclave, EnclaveError, GroupState, GroupType, PrivacyGroupId, PrivacyGroupPayload,
        SealedEnvelope,
    };
    pub use crate::network::{NetworkNodes, PartyInfo};
    pub use crate::node::{Node, NodeError, PushJob, PushProvider};
    pub use crate::storage::{KeyValueStore, StorageConfig, StorageError};
    pub use crate::store::{Storage, StoreError};
    pub use crate::version::build_info;
}
