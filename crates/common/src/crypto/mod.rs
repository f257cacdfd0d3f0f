//! Cryptographic primitives for the relay
//!
//! - **Identity & addressing**: X25519 keypairs (`SecretKey`/`PublicKey`).
//!   Public keys address recipients and registry entries.
//! - **Payload encryption**: ChaCha20-Poly1305 under a fresh per-message
//!   `Secret`.
//! - **Content addressing**: BLAKE3 digests rendered as base64 `StorageKey`s.
//!
//! The enclave composes these into sealed envelopes; nothing outside the
//! enclave touches a `SecretKey` after startup.

mod digest;
mod keys;
mod secret;

pub use digest::{digest, DigestError, StorageKey, DIGEST_SIZE};
pub use keys::{KeyError, PublicKey, SecretKey, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE};
pub use secret::{generate_nonce, Secret, SecretError, NONCE_SIZE, SECRET_SIZE, TAG_SIZE};
