use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_with::{base64::Base64, serde_as};

use crate::crypto::{PublicKey, StorageKey, DIGEST_SIZE};

/// How a privacy group identifier is seeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupType {
    /// Seeded by a random value chosen by the creator. Groups implied by a
    /// direct send are LEGACY groups without a seed.
    Legacy,
    /// Identified by membership alone. Never seeded.
    Onchain,
}

impl GroupType {
    fn domain_tag(&self) -> &'static [u8] {
        match self {
            GroupType::Legacy => b"hush/privacy-group/legacy",
            GroupType::Onchain => b"hush/privacy-group/onchain",
        }
    }
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupType::Legacy => f.write_str("LEGACY"),
            GroupType::Onchain => f.write_str("ONCHAIN"),
        }
    }
}

impl FromStr for GroupType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LEGACY" => Ok(GroupType::Legacy),
            "ONCHAIN" => Ok(GroupType::Onchain),
            other => Err(format!("unknown privacy group type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupState {
    Active,
    Deleted,
}

/// Deterministic identifier of a privacy group.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrivacyGroupId([u8; DIGEST_SIZE]);

impl PrivacyGroupId {
    pub fn as_bytes(&self) -> &[u8; DIGEST_SIZE] {
        &self.0
    }

    /// The store key under which the group's metadata lives
    pub fn storage_key(&self) -> StorageKey {
        StorageKey::from_digest(&self.0)
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }
}

impl From<[u8; DIGEST_SIZE]> for PrivacyGroupId {
    fn from(bytes: [u8; DIGEST_SIZE]) -> Self {
        Self(bytes)
    }
}

impl FromStr for PrivacyGroupId {
    type Err = crate::crypto::DigestError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: StorageKey = s.parse()?;
        Ok(Self(key.to_digest()?))
    }
}

impl fmt::Display for PrivacyGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl fmt::Debug for PrivacyGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivacyGroupId({})", self.to_base64())
    }
}

impl Serialize for PrivacyGroupId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for PrivacyGroupId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        encoded.parse().map_err(serde::de::Error::custom)
    }
}

/// Derive a privacy group identifier.
///
/// Members are sorted and deduplicated before hashing, so any permutation of
/// the same membership yields the same identifier. The seed only takes part
/// for LEGACY groups. Member count and seed length are framed into the hash
/// so a seed can never impersonate an extra member.
pub fn derive_privacy_group_id(
    addresses: &[PublicKey],
    random_seed: Option<&[u8]>,
    group_type: GroupType,
) -> PrivacyGroupId {
    let members: BTreeSet<&PublicKey> = addresses.iter().collect();

    let mut hasher = blake3::Hasher::new();
    hasher.update(group_type.domain_tag());
    hasher.update(&(members.len() as u64).to_le_bytes());
    for member in members {
        hasher.update(member.as_bytes());
    }
    if let (GroupType::Legacy, Some(seed)) = (group_type, random_seed) {
        hasher.update(&(seed.len() as u64).to_le_bytes());
        hasher.update(seed);
    }
    PrivacyGroupId(*hasher.finalize().as_bytes())
}

/// Metadata describing a privacy group.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivacyGroupPayload {
    /// Sorted, deduplicated member keys
    pub addresses: Vec<PublicKey>,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub group_type: GroupType,
    #[serde_as(as = "Option<Base64>")]
    pub random_seed: Option<Vec<u8>>,
    pub state: GroupState,
}

impl PrivacyGroupPayload {
    /// Build an ACTIVE group. Addresses are normalized and any seed handed
    /// to an ONCHAIN group is dropped.
    pub fn new(
        addresses: impl IntoIterator<Item = PublicKey>,
        name: impl Into<String>,
        description: impl Into<String>,
        group_type: GroupType,
        random_seed: Option<Vec<u8>>,
    ) -> Self {
        let addresses: BTreeSet<PublicKey> = addresses.into_iter().collect();
        let random_seed = match group_type {
            GroupType::Legacy => random_seed,
            GroupType::Onchain => None,
        };
        Self {
            addresses: addresses.into_iter().collect(),
            name: name.into(),
            description: description.into(),
            group_type,
            random_seed,
            state: GroupState::Active,
        }
    }

    /// The seedless LEGACY group every participant of a direct send can
    /// derive from the recipient list alone.
    pub fn implied(addresses: impl IntoIterator<Item = PublicKey>) -> Self {
        Self::new(addresses, "", "", GroupType::Legacy, None)
    }

    pub fn id(&self) -> PrivacyGroupId {
        derive_privacy_group_id(
            &self.addresses,
            self.random_seed.as_deref(),
            self.group_type,
        )
    }

    pub fn is_active(&self) -> bool {
        self.state == GroupState::Active
    }

    pub fn contains(&self, key: &PublicKey) -> bool {
        self.addresses.binary_search(key).is_ok()
    }

    /// Re-apply the invariants of [`PrivacyGroupPayload::new`] to a group
    /// that arrived from outside, e.g. deserialized from a peer.
    pub fn normalized(self) -> Self {
        let state = self.state;
        let mut group = Self::new(
            self.addresses,
            self.name,
            self.description,
            self.group_type,
            self.random_seed,
        );
        group.state = state;
        group
    }

    pub fn deleted(mut self) -> Self {
        self.state = GroupState::Deleted;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SecretKey;

    fn keys(n: usize) -> Vec<PublicKey> {
        (0..n).map(|_| SecretKey::generate().unwrap().public()).collect()
    }

    #[test]
    fn test_id_ignores_order_and_duplicates() {
        let k = keys(3);
        let seed = b"seed".as_slice();
        let a = derive_privacy_group_id(&[k[0], k[1], k[2]], Some(seed), GroupType::Legacy);
        let b = derive_privacy_group_id(&[k[2], k[0], k[1], k[0]], Some(seed), GroupType::Legacy);
        assert_eq!(a, b);
    }

    #[test]
    fn test_seed_changes_legacy_id() {
        let k = keys(2);
        let a = derive_privacy_group_id(&k, Some(&b"one"[..]), GroupType::Legacy);
        let b = derive_privacy_group_id(&k, Some(&b"two"[..]), GroupType::Legacy);
        let c = derive_privacy_group_id(&k, None, GroupType::Legacy);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_onchain_ignores_seed() {
        let k = keys(2);
        let a = derive_privacy_group_id(&k, Some(&b"one"[..]), GroupType::Onchain);
        let b = derive_privacy_group_id(&k, None, GroupType::Onchain);
        assert_eq!(a, b);
        assert_ne!(a, derive_privacy_group_id(&k, None, GroupType::Legacy));
    }

    #[test]
    fn test_seed_cannot_mimic_member() {
        let k = keys(2);
        let with_seed = derive_privacy_group_id(&k[..1], Some(&k[1].as_bytes()[..]), GroupType::Legacy);
        let mut both = k.clone();
        both.sort();
        let without_seed = derive_privacy_group_id(&both, None, GroupType::Legacy);
        assert_ne!(with_seed, without_seed);
    }

    #[test]
    fn test_payload_normalizes_members() {
        let k = keys(3);
        let group = PrivacyGroupPayload::new(
            vec![k[2], k[1], k[2], k[0]],
            "name",
            "description",
            GroupType::Onchain,
            Some(vec![1, 2, 3]),
        );
        assert_eq!(group.addresses.len(), 3);
        assert!(group.addresses.windows(2).all(|w| w[0] < w[1]));
        assert!(group.random_seed.is_none());
        assert!(group.contains(&k[1]));
        assert!(group.is_active());
        assert!(!group.clone().deleted().is_active());
        assert_eq!(group.id(), group.clone().deleted().id());
    }

    #[test]
    fn test_normalized_sorts_foreign_members() {
        let k = keys(3);
        let mut sorted = k.clone();
        sorted.sort();
        let foreign = PrivacyGroupPayload {
            addresses: vec![sorted[2], sorted[0], sorted[1], sorted[0]],
            name: "n".into(),
            description: String::new(),
            group_type: GroupType::Legacy,
            random_seed: None,
            state: GroupState::Deleted,
        };
        let group = foreign.normalized();
        assert_eq!(group.addresses, sorted);
        assert!(sorted.iter().all(|key| group.contains(key)));
        assert_eq!(group.state, GroupState::Deleted);
    }

    #[test]
    fn test_payload_json_shape() {
        let k = keys(1);
        let group = PrivacyGroupPayload::new(k, "n", "d", GroupType::Legacy, Some(vec![9; 4]));
        let json = serde_json::to_value(&group).unwrap();
        assert_eq!(json["type"], "LEGACY");
        assert_eq!(json["state"], "ACTIVE");
        assert_eq!(json["random_seed"], "CQkJCQ==");
        let back: PrivacyGroupPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back, group);
    }

    #[test]
    fn test_id_string_round_trip() {
        let id = PrivacyGroupPayload::implied(keys(2)).id();
        let parsed: PrivacyGroupId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert_eq!(id.storage_key().as_str(), id.to_base64());
    }
}
