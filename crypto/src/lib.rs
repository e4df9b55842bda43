//! Cryptographic primitives for the BSQ DAO.
//!
//! - **Blake2b** for content digests (20-byte commitments) and snapshot hashes
//! - **ChaCha20-Poly1305** for blind-vote ballot-list encryption
//! - **Ed25519** for proposal and blind-vote owner signatures

pub mod encryption;
pub mod hash;
pub mod keys;
pub mod sign;

pub use encryption::{EncryptionError, SecretKey};
pub use hash::{blake2b_256, blake2b_256_multi, digest, digest_multi};
pub use keys::{generate_keypair, keypair_from_private, keypair_from_seed, public_from_private};
pub use sign::{sign_message, verify_signature};
