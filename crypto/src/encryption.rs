//! Symmetric encryption of blind-vote ballot lists.
//!
//! A voter generates a fresh [`SecretKey`] per blind vote, encrypts the
//! serialized ballot list with ChaCha20-Poly1305 and commits to the digest of
//! the ciphertext. The key is disclosed on chain at reveal time, so anyone can
//! decrypt once the reveal is confirmed.
//!
//! Ciphertext layout: `nonce (12 bytes) || AEAD ciphertext || tag (16 bytes)`.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncryptionError {
    #[error("ciphertext too short: {0} bytes")]
    TooShort(usize),

    #[error("encryption failed")]
    Encrypt,

    #[error("decryption failed: wrong key or tampered ciphertext")]
    Decrypt,
}

/// A 256-bit symmetric key for one blind vote.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; SecretKey::LEN]);

impl SecretKey {
    pub const LEN: usize = 32;

    pub fn generate() -> Self {
        let mut bytes = [0u8; Self::LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.0))
    }

    /// Encrypt `plaintext` under a fresh random nonce.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher()
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| EncryptionError::Encrypt)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        if data.len() < NONCE_LEN + TAG_LEN {
            return Err(EncryptionError::TooShort(data.len()));
        }
        let (nonce, ciphertext) = data.split_at(NONCE_LEN);
        self.cipher()
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| EncryptionError::Decrypt)
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let key = SecretKey::generate();
        let plaintext = b"sorted ballot list".to_vec();
        let encrypted = key.encrypt(&plaintext).unwrap();
        assert_eq!(encrypted.len(), NONCE_LEN + plaintext.len() + TAG_LEN);
        assert_eq!(key.decrypt(&encrypted).unwrap(), plaintext);
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let encrypted = SecretKey::from_bytes([1; 32]).encrypt(b"ballots").unwrap();
        assert_eq!(
            SecretKey::from_bytes([2; 32]).decrypt(&encrypted),
            Err(EncryptionError::Decrypt)
        );
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let key = SecretKey::generate();
        let mut encrypted = key.encrypt(b"ballots").unwrap();
        let last = encrypted.len() - 1;
        encrypted[last] ^= 0x01;
        assert_eq!(key.decrypt(&encrypted), Err(EncryptionError::Decrypt));
    }

    #[test]
    fn fresh_nonce_per_encryption() {
        let key = SecretKey::generate();
        assert_ne!(key.encrypt(b"same").unwrap(), key.encrypt(b"same").unwrap());
    }

    #[test]
    fn short_input_is_rejected() {
        let key = SecretKey::generate();
        assert_eq!(key.decrypt(&[0u8; 10]), Err(EncryptionError::TooShort(10)));
    }

    #[test]
    fn debug_hides_key_material() {
        assert_eq!(format!("{:?}", SecretKey::from_bytes([7; 32])), "SecretKey(..)");
    }
}
