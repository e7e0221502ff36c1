//! Encryption of stored calendar credentials.
//!
//! Payloads are sealed with AES-256-GCM under a single deployment key and
//! stored as base64 text: a fresh 12-byte nonce followed by the ciphertext.
//!
//! ```rust
//! use umi_providers::CredentialCipher;
//!
//! let key = CredentialCipher::generate_key();
//! let cipher = CredentialCipher::from_base64_key(&key)?;
//! let sealed = cipher.encrypt(b"{\"token\":\"t\"}")?;
//! assert_eq!(cipher.decrypt(&sealed)?, b"{\"token\":\"t\"}");
//! # Ok::<(), umi_providers::CipherError>(())
//! ```

use std::fmt;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use thiserror::Error;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Failures of credential encryption.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The key is not base64 for exactly 32 bytes.
    #[error("encryption key must be base64 for 32 bytes")]
    InvalidKey,

    /// The stored text is not base64.
    #[error("encrypted payload is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// The stored payload is shorter than a nonce.
    #[error("encrypted payload is truncated")]
    Truncated,

    /// Authentication failed: wrong key or tampered payload.
    #[error("failed to decrypt payload (wrong key or corrupted data)")]
    Decrypt,

    /// Encryption itself failed.
    #[error("failed to encrypt payload")]
    Encrypt,
}

/// AES-256-GCM sealing of credential payloads.
#[derive(Clone)]
pub struct CredentialCipher {
    cipher: Aes256Gcm,
}

impl fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl CredentialCipher {
    /// Creates a cipher from a base64-encoded 32-byte key.
    pub fn from_base64_key(key: &str) -> Result<Self, CipherError> {
        let bytes = BASE64
            .decode(key.trim())
            .map_err(|_| CipherError::InvalidKey)?;
        if bytes.len() != KEY_LEN {
            return Err(CipherError::InvalidKey);
        }
        let key = Key::<Aes256Gcm>::from_slice(&bytes);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Generates a random key, base64-encoded.
    pub fn generate_key() -> String {
        BASE64.encode(Aes256Gcm::generate_key(OsRng))
    }

    /// Seals `plaintext` into base64 text.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, CipherError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| CipherError::Encrypt)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(sealed))
    }

    /// Opens base64 text produced by [`encrypt`](Self::encrypt).
    pub fn decrypt(&self, sealed: &str) -> Result<Vec<u8>, CipherError> {
        let bytes = BASE64.decode(sealed.trim())?;
        if bytes.len() < NONCE_LEN {
            return Err(CipherError::Truncated);
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CipherError::Decrypt)
    }
}
