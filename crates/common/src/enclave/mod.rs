//! Sealing engine and sole holder of private key material.
//!
//! # Envelope construction
//!
//! 1. Generate a fresh payload `Secret` and nonce; encrypt the payload.
//! 2. For every recipient, agree an X25519 shared secret between the
//!    sender's private key and the recipient's public key.
//! 3. Derive a key-encryption key from that shared secret with BLAKE3 in
//!    key derivation mode, bound to both public keys.
//! 4. Wrap the payload secret under the key-encryption key with its own
//!    nonce.
//!
//! A reader repeats the agreement from its side (its private key, the
//! sender's public key) and tries the resulting key against every wrapped
//! entry. Entries are unlabeled so recipients cannot enumerate each other.

use std::collections::{BTreeMap, BTreeSet};

mod envelope;
mod privacy_group;

pub use envelope::{EncryptedKey, SealedEnvelope};
pub use privacy_group::{
    derive_privacy_group_id, GroupState, GroupType, PrivacyGroupId, PrivacyGroupPayload,
};

use crate::crypto::{generate_nonce, PublicKey, Secret, SecretError, SecretKey};

const KEY_WRAP_CONTEXT: &str = "hush 2025-03-01 enclave payload key wrap";

#[derive(Debug, thiserror::Error)]
pub enum EnclaveError {
    #[error("enclave has no key pairs loaded")]
    NoKeys,
    #[error("envelope has no recipients")]
    NoRecipients,
    /// The sender is not held by this enclave, or a recipient key is unusable
    #[error("unknown key: {0}")]
    UnknownKey(PublicKey),
    #[error("{0} is not a recipient of this payload")]
    NotARecipient(PublicKey),
    #[error("payload decryption failed")]
    DecryptionFailed,
    #[error("crypto error: {0}")]
    Crypto(#[from] SecretError),
}

/// Holds the node's key pairs and performs every operation that needs them.
///
/// Constructed once at startup and shared by reference.
#[derive(Debug)]
pub struct Enclave {
    keys: BTreeMap<PublicKey, SecretKey>,
    default_key: PublicKey,
}

impl Enclave {
    /// Load key pairs. The first key becomes the node's default identity.
    pub fn new(keys: impl IntoIterator<Item = SecretKey>) -> Result<Self, EnclaveError> {
        let mut default_key = None;
        let mut held = BTreeMap::new();
        for key in keys {
            let public = key.public();
            default_key.get_or_insert(public);
            held.insert(public, key);
        }
        let default_key = default_key.ok_or(EnclaveError::NoKeys)?;
        tracing::debug!(keys = held.len(), default = %default_key, "enclave loaded");
        Ok(Self {
            keys: held,
            default_key,
        })
    }

    pub fn default_key(&self) -> PublicKey {
        self.default_key
    }

    pub fn public_keys(&self) -> Vec<PublicKey> {
        self.keys.keys().copied().collect()
    }

    pub fn holds(&self, key: &PublicKey) -> bool {
        self.keys.contains_key(key)
    }

    /// Seal `payload` from `from` to every key in `to`.
    ///
    /// Duplicate recipients collapse, so the envelope carries one wrapped
    /// key per distinct recipient.
    pub fn seal(
        &self,
        payload: &[u8],
        from: &PublicKey,
        to: &[PublicKey],
    ) -> Result<SealedEnvelope, EnclaveError> {
        let sender = self
            .keys
            .get(from)
            .ok_or(EnclaveError::UnknownKey(*from))?;
        let recipients: BTreeSet<&PublicKey> = to.iter().collect();
        if recipients.is_empty() {
            return Err(EnclaveError::NoRecipients);
        }

        let secret = Secret::generate()?;
        let nonce = generate_nonce()?;
        let cipher_text = secret.encrypt(&nonce, payload)?;

        let mut encrypted_keys = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            let kek = key_encryption_key(sender, from, recipient)
                .ok_or(EnclaveError::UnknownKey(*recipient))?;
            let key_nonce = generate_nonce()?;
            encrypted_keys.push(EncryptedKey {
                ciphertext: kek.encrypt(&key_nonce, secret.bytes())?,
                nonce: key_nonce,
            });
        }

        Ok(SealedEnvelope {
            nonce,
            sender: *from,
            encrypted_keys,
            cipher_text,
            privacy_group_id: None,
        })
    }

    /// Recover the payload of `envelope` as `recipient`.
    ///
    /// # Errors
    ///
    /// - [`EnclaveError::NotARecipient`] if this enclave does not hold
    ///   `recipient` or no wrapped key opens under it
    /// - [`EnclaveError::DecryptionFailed`] if a wrapped key opened but the
    ///   cipher text does not authenticate
    pub fn unseal(
        &self,
        envelope: &SealedEnvelope,
        recipient: &PublicKey,
    ) -> Result<Vec<u8>, EnclaveError> {
        let secret_key = self
            .keys
            .get(recipient)
            .ok_or(EnclaveError::NotARecipient(*recipient))?;
        let kek = key_encryption_key(secret_key, &envelope.sender, recipient)
            .ok_or(EnclaveError::DecryptionFailed)?;

        let secret = envelope
            .encrypted_keys
            .iter()
            .find_map(|entry| kek.decrypt(&entry.nonce, &entry.ciphertext).ok())
            .ok_or(EnclaveError::NotARecipient(*recipient))?;
        let secret = Secret::from_slice(&secret).map_err(|_| EnclaveError::DecryptionFailed)?;

        secret
            .decrypt(&envelope.nonce, &envelope.cipher_text)
            .map_err(|_| EnclaveError::DecryptionFailed)
    }

    pub fn derive_privacy_group_id(
        &self,
        addresses: &[PublicKey],
        random_seed: Option<&[u8]>,
        group_type: GroupType,
    ) -> PrivacyGroupId {
        derive_privacy_group_id(addresses, random_seed, group_type)
    }
}

/// Key that wraps a payload secret between `sender` and `recipient`.
///
/// `ours` is whichever private half the caller holds; the agreement is the
/// same from both ends. Returns `None` for a low order peer key.
fn key_encryption_key(
    ours: &SecretKey,
    sender: &PublicKey,
    recipient: &PublicKey,
) -> Option<Secret> {
    let peer = if ours.public() == *sender {
        recipient
    } else {
        sender
    };
    let shared = ours.agree(peer)?;

    let mut material = Vec::with_capacity(96);
    material.extend_from_slice(shared.as_bytes());
    material.extend_from_slice(sender.as_bytes());
    material.extend_from_slice(recipient.as_bytes());
    Some(Secret::from(blake3::derive_key(KEY_WRAP_CONTEXT, &material)))
}
