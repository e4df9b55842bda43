//! Ed25519 signing of governance payloads.
//!
//! Proposals and blind votes are signed over their canonical bincode bytes
//! (signature field excluded) so receivers can check owner consistency.

use dao_types::{PrivateKey, PublicKey, Signature};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};

pub fn sign_message(message: &[u8], private_key: &PrivateKey) -> Signature {
    let signing_key = SigningKey::from_bytes(&private_key.0);
    Signature(signing_key.sign(message).to_bytes())
}

/// Verify `signature` over `message` under `public_key`.
///
/// Uses strict verification: small-order keys and non-canonical signatures
/// are rejected, so a payload has exactly one valid signature per key.
pub fn verify_signature(message: &[u8], signature: &Signature, public_key: &PublicKey) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(&public_key.0) else {
        return false;
    };
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    verifying_key.verify_strict(message, &sig).is_ok()
}
