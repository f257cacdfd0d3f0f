//! Content addressing.
//!
//! A [`StorageKey`] is a BLAKE3 digest rendered in standard base64. It keys
//! both sealed payloads (digest of the serialized envelope) and privacy
//! groups (the derived group identifier). Lookups must use the exact string
//! produced at store time.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Size of a BLAKE3 digest in bytes (256 bits)
pub const DIGEST_SIZE: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("invalid storage key encoding: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("invalid storage key length, expected {DIGEST_SIZE}, got {0}")]
    Length(usize),
}

/// Hash arbitrary bytes into a raw digest
pub fn digest(data: &[u8]) -> [u8; DIGEST_SIZE] {
    *blake3::hash(data).as_bytes()
}

/// Base64 rendering of a 32 byte digest.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StorageKey(String);

impl StorageKey {
    /// Key for the digest of `data`
    pub fn of(data: &[u8]) -> Self {
        Self::from_digest(&digest(data))
    }

    pub fn from_digest(digest: &[u8; DIGEST_SIZE]) -> Self {
        Self(STANDARD.encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Decode back into the raw digest bytes
    pub fn to_digest(&self) -> Result<[u8; DIGEST_SIZE], DigestError> {
        let raw = STANDARD.decode(&self.0)?;
        raw.as_slice()
            .try_into()
            .map_err(|_| DigestError::Length(raw.len()))
    }
}

impl FromStr for StorageKey {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = STANDARD.decode(s.trim())?;
        let digest: [u8; DIGEST_SIZE] = raw
            .as_slice()
            .try_into()
            .map_err(|_| DigestError::Length(raw.len()))?;
        Ok(Self::from_digest(&digest))
    }
}

impl TryFrom<String> for StorageKey {
    type Error = DigestError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StorageKey> for String {
    fn from(key: StorageKey) -> Self {
        key.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageKey({})", self.0)
    }
}
