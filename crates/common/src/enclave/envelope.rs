use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};

use crate::crypto::{PublicKey, StorageKey, NONCE_SIZE};

use super::privacy_group::PrivacyGroupId;

/// The payload secret wrapped for one recipient.
///
/// Entries carry no recipient label; a reader finds its entry by trial.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedKey {
    #[serde_as(as = "Base64")]
    pub ciphertext: Vec<u8>,
    #[serde_as(as = "Base64")]
    pub nonce: [u8; NONCE_SIZE],
}

/// A payload sealed for a fixed set of recipients.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedEnvelope {
    /// Nonce the cipher text was encrypted under
    #[serde_as(as = "Base64")]
    pub nonce: [u8; NONCE_SIZE],
    pub sender: PublicKey,
    /// One entry per recipient, in recipient key order
    pub encrypted_keys: Vec<EncryptedKey>,
    #[serde_as(as = "Base64")]
    pub cipher_text: Vec<u8>,
    /// Group the payload was addressed to, if any
    pub privacy_group_id: Option<PrivacyGroupId>,
}

impl SealedEnvelope {
    /// Canonical byte encoding. Both the digest key and the persisted value
    /// are computed from this.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }

    /// Content address of this envelope
    pub fn digest(&self) -> Result<StorageKey, bincode::Error> {
        Ok(StorageKey::of(&self.to_bytes()?))
    }

    pub fn recipient_count(&self) -> usize {
        self.encrypted_keys.len()
    }

    /// Tag the envelope with the group it is addressed to.
    ///
    /// The tag is part of the content address, so it must be set before the
    /// envelope is stored.
    pub fn with_privacy_group(mut self, id: PrivacyGroupId) -> Self {
        self.privacy_group_id = Some(id);
        self
    }
}
