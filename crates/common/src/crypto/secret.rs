//! Symmetric encryption using ChaCha20-Poly1305
//!
//! Every sealed payload gets its own `Secret`. The same primitive wraps that
//! secret once per recipient under a key derived from an X25519 agreement.
//! Nonces are carried explicitly next to the ciphertext they belong to
//! because the envelope format records them as separate fields.

use std::ops::Deref;

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use serde::{Deserialize, Serialize};

/// Size of ChaCha20-Poly1305 nonce in bytes
pub const NONCE_SIZE: usize = 12;
/// Size of ChaCha20-Poly1305 key in bytes (256 bits)
pub const SECRET_SIZE: usize = 32;
/// Size of the Poly1305 authentication tag appended to every ciphertext
pub const TAG_SIZE: usize = 16;

/// Errors that can occur during encryption/decryption
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("secret error: {0}")]
    Default(#[from] anyhow::Error),
    /// Authentication tag did not verify: wrong key, wrong nonce or tampered data
    #[error("authentication failed")]
    Authentication,
}

/// Fill a fresh nonce from the operating system RNG
pub fn generate_nonce() -> Result<[u8; NONCE_SIZE], SecretError> {
    let mut nonce = [0u8; NONCE_SIZE];
    getrandom::getrandom(&mut nonce)
        .map_err(|e| anyhow::anyhow!("failed to generate nonce: {}", e))?;
    Ok(nonce)
}

/// A 256-bit symmetric key.
#[derive(PartialEq, Clone, Serialize, Deserialize)]
pub struct Secret([u8; SECRET_SIZE]);

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(..)")
    }
}

impl Deref for Secret {
    type Target = [u8; SECRET_SIZE];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<[u8; SECRET_SIZE]> for Secret {
    fn from(bytes: [u8; SECRET_SIZE]) -> Self {
        Secret(bytes)
    }
}

impl Secret {
    /// Generate a new random secret using a cryptographically secure RNG
    pub fn generate() -> Result<Self, SecretError> {
        let mut buff = [0; SECRET_SIZE];
        getrandom::getrandom(&mut buff)
            .map_err(|e| anyhow::anyhow!("failed to generate random bytes: {}", e))?;
        Ok(Self(buff))
    }

    /// Create a secret from a byte slice
    ///
    /// # Errors
    ///
    /// Returns an error if the slice length is not exactly `SECRET_SIZE` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, SecretError> {
        if data.len() != SECRET_SIZE {
            return Err(anyhow::anyhow!(
                "invalid secret size, expected {}, got {}",
                SECRET_SIZE,
                data.len()
            )
            .into());
        }
        let mut buff = [0; SECRET_SIZE];
        buff.copy_from_slice(data);
        Ok(buff.into())
    }

    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(self.bytes()))
    }

    /// Encrypt `data` under this secret and the given nonce.
    ///
    /// Output is `ciphertext || auth_tag`. The caller owns the nonce and must
    /// never reuse it with the same secret.
    pub fn encrypt(&self, nonce: &[u8; NONCE_SIZE], data: &[u8]) -> Result<Vec<u8>, SecretError> {
        self.cipher()
            .encrypt(Nonce::from_slice(nonce), data)
            .map_err(|_| anyhow::anyhow!("encrypt error").into())
    }

    /// Decrypt `data` produced by [`Secret::encrypt`] with the same nonce.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::Authentication`] if the tag does not verify.
    pub fn decrypt(&self, nonce: &[u8; NONCE_SIZE], data: &[u8]) -> Result<Vec<u8>, SecretError> {
        self.cipher()
            .decrypt(Nonce::from_slice(nonce), data)
            .map_err(|_| SecretError::Authentication)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let secret = Secret::generate().unwrap();
        let nonce = generate_nonce().unwrap();
        let data = b"hello world";

        let encrypted = secret.encrypt(&nonce, data).unwrap();
        assert_eq!(encrypted.len(), data.len() + TAG_SIZE);
        let decrypted = secret.decrypt(&nonce, &encrypted).unwrap();
        assert_eq!(data, &decrypted[..]);
    }

    #[test]
    fn test_wrong_nonce_fails_authentication() {
        let secret = Secret::generate().unwrap();
        let nonce = generate_nonce().unwrap();
        let encrypted = secret.encrypt(&nonce, b"payload").unwrap();

        let mut other = nonce;
        other[0] ^= 0xff;
        assert!(matches!(
            secret.decrypt(&other, &encrypted),
            Err(SecretError::Authentication)
        ));
    }

    #[test]
    fn test_tampered_ciphertext_fails_authentication() {
        let secret = Secret::generate().unwrap();
        let nonce = generate_nonce().unwrap();
        let mut encrypted = secret.encrypt(&nonce, b"payload").unwrap();
        encrypted[0] ^= 0x01;
        assert!(secret.decrypt(&nonce, &encrypted).is_err());
    }

    #[test]
    fn test_from_slice_checks_length() {
        assert!(Secret::from_slice(&[0u8; 31]).is_err());
        assert!(Secret::from_slice(&[0u8; SECRET_SIZE]).is_ok());
    }
}
