use crate::crypto::{PublicKey, StorageKey};
use crate::enclave::{GroupType, PrivacyGroupId};

/// Who a payload is addressed to.
#[derive(Debug, Clone)]
pub enum Recipients {
    /// An explicit key list. Implies a seedless LEGACY group.
    Keys(Vec<PublicKey>),
    /// The members of an existing privacy group.
    PrivacyGroup(PrivacyGroupId),
}

#[derive(Debug, Clone)]
pub struct SendRequest {
    pub payload: Vec<u8>,
    /// Defaults to the node's default key
    pub from: Option<PublicKey>,
    pub to: Recipients,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendResponse {
    pub key: StorageKey,
    pub privacy_group_id: PrivacyGroupId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveResponse {
    pub payload: Vec<u8>,
    pub privacy_group_id: Option<PrivacyGroupId>,
}

#[derive(Debug, Clone)]
pub struct CreatePrivacyGroup {
    /// Creator; always added to the members. Defaults to the node's key.
    pub from: Option<PublicKey>,
    pub addresses: Vec<PublicKey>,
    pub name: String,
    pub description: String,
    pub group_type: GroupType,
    /// LEGACY only. A random seed is drawn when absent.
    pub random_seed: Option<Vec<u8>>,
}
