//! Blake2b hashing.
//!
//! Two widths are used: 20-byte digests for everything that is committed on
//! chain or keys a peer-to-peer store, and 32-byte hashes for local integrity
//! checks (ledger snapshots).

use blake2::digest::consts::{U20, U32};
use blake2::{Blake2b, Digest as _};
use dao_types::Digest;

type Blake2b160 = Blake2b<U20>;
type Blake2b256 = Blake2b<U32>;

/// 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    blake2b_256_multi(&[data])
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// 20-byte content digest, the commitment carried in OP_RETURN payloads.
pub fn digest(data: &[u8]) -> Digest {
    digest_multi(&[data])
}

pub fn digest_multi(parts: &[&[u8]]) -> Digest {
    let mut hasher = Blake2b160::new();
    for part in parts {
        hasher.update(part);
    }
    Digest::new(hasher.finalize().into())
}
