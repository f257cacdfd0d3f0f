use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use x25519_dalek::{PublicKey as X25519PublicKey, SharedSecret, StaticSecret};

/// Size of an X25519 private key in bytes
pub const PRIVATE_KEY_SIZE: usize = 32;
/// Size of an X25519 public key in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;

const PEM_TAG: &str = "PRIVATE KEY";

/// Errors that can occur during key operations
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("key error: {0}")]
    Default(#[from] anyhow::Error),
}

/// Public half of a sealing key pair.
///
/// Public keys are the addressing unit of the relay: envelopes are sealed to
/// them, privacy groups are built from them and the peer registry maps them
/// to node URLs. On the wire they are rendered as standard base64 of the raw
/// 32 key bytes.
///
/// Ordering is by raw bytes, which is what makes privacy group derivation
/// independent of the order members were supplied in.
///
/// # Examples
///
/// ```ignore
/// let secret_key = SecretKey::generate();
/// let public_key = secret_key.public();
///
/// let encoded = public_key.to_base64();
/// let recovered = PublicKey::from_base64(&encoded)?;
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey([u8; PUBLIC_KEY_SIZE]);

impl From<[u8; PUBLIC_KEY_SIZE]> for PublicKey {
    fn from(bytes: [u8; PUBLIC_KEY_SIZE]) -> Self {
        PublicKey(bytes)
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = KeyError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != PUBLIC_KEY_SIZE {
            return Err(anyhow::anyhow!(
                "invalid public key size, expected {}, got {}",
                PUBLIC_KEY_SIZE,
                bytes.len()
            )
            .into());
        }
        let mut buff = [0; PUBLIC_KEY_SIZE];
        buff.copy_from_slice(bytes);
        Ok(buff.into())
    }
}

impl PublicKey {
    /// Parse a public key from its standard base64 encoding
    pub fn from_base64(encoded: &str) -> Result<Self, KeyError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| anyhow::anyhow!("public key base64 decode error: {}", e))?;
        Self::try_from(bytes.as_slice())
    }

    /// Parse a public key from a hexadecimal string
    ///
    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let mut buff = [0; PUBLIC_KEY_SIZE];
        hex::decode_to_slice(hex, &mut buff)
            .map_err(|_| anyhow::anyhow!("public key hex decode error"))?;
        Ok(buff.into())
    }

    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub(crate) fn to_x25519(self) -> X25519PublicKey {
        X25519PublicKey::from(self.0)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_base64())
    }
}

impl FromStr for PublicKey {
    type Err = KeyError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base64(s)
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        PublicKey::from_base64(&encoded).map_err(serde::de::Error::custom)
    }
}

/// Private half of a sealing key pair.
///
/// Only the enclave holds these at runtime. On disk they live as PEM files
/// tagged `PRIVATE KEY` inside the node directory.
///
/// # Examples
///
/// ```ignore
/// let secret_key = SecretKey::generate();
/// std::fs::write("key.pem", secret_key.to_pem())?;
///
/// let pem = std::fs::read_to_string("key.pem")?;
/// let recovered = SecretKey::from_pem(&pem)?;
/// ```
#[derive(Clone)]
pub struct SecretKey(StaticSecret);

impl From<[u8; PRIVATE_KEY_SIZE]> for SecretKey {
    fn from(secret: [u8; PRIVATE_KEY_SIZE]) -> Self {
        Self(StaticSecret::from(secret))
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SecretKey").field(&self.public()).finish()
    }
}

impl SecretKey {
    /// Generate a new random secret key using the operating system RNG
    pub fn generate() -> Result<Self, KeyError> {
        let mut bytes = [0u8; PRIVATE_KEY_SIZE];
        getrandom::getrandom(&mut bytes)
            .map_err(|e| anyhow::anyhow!("failed to generate random bytes: {}", e))?;
        Ok(Self::from(bytes))
    }

    /// Parse a secret key from a hexadecimal string
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let mut buff = [0; PRIVATE_KEY_SIZE];
        hex::decode_to_slice(hex, &mut buff)
            .map_err(|_| anyhow::anyhow!("private key hex decode error"))?;
        Ok(Self::from(buff))
    }

    pub fn public(&self) -> PublicKey {
        PublicKey(X25519PublicKey::from(&self.0).to_bytes())
    }

    pub fn to_bytes(&self) -> [u8; PRIVATE_KEY_SIZE] {
        self.0.to_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Encode secret key in PEM format with tag "PRIVATE KEY".
    pub fn to_pem(&self) -> String {
        let pem = pem::Pem::new(PEM_TAG, self.to_bytes());
        pem::encode(&pem)
    }

    /// Parse a secret key from PEM format
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The PEM string is malformed
    /// - The PEM tag is not "PRIVATE KEY"
    /// - The key size is incorrect
    pub fn from_pem(pem_str: &str) -> Result<Self, KeyError> {
        let pem = pem::parse(pem_str).map_err(|e| anyhow::anyhow!("failed to parse PEM: {}", e))?;

        if pem.tag() != PEM_TAG {
            return Err(anyhow::anyhow!("invalid PEM tag, expected PRIVATE KEY").into());
        }

        let contents = pem.contents();
        if contents.len() != PRIVATE_KEY_SIZE {
            return Err(anyhow::anyhow!(
                "invalid private key size in PEM, expected {}, got {}",
                PRIVATE_KEY_SIZE,
                contents.len()
            )
            .into());
        }

        let mut bytes = [0u8; PRIVATE_KEY_SIZE];
        bytes.copy_from_slice(contents);
        Ok(Self::from(bytes))
    }

    /// X25519 agreement with a peer public key.
    ///
    /// Returns `None` when the peer key is a low order point and the
    /// agreement would not depend on our secret.
    pub(crate) fn agree(&self, peer: &PublicKey) -> Option<SharedSecret> {
        let shared = self.0.diffie_hellman(&peer.to_x25519());
        shared.was_contributory().then_some(shared)
    }
}
