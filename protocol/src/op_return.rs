//! OP_RETURN encoding and decoding.

use crate::error::OpReturnError;
use crate::version::{is_compatible, DAO_PROTOCOL_VERSION};
use dao_types::Digest;
use serde::{Deserialize, Serialize};

/// Base-chain relay limit for OP_RETURN data.
pub const MAX_OP_RETURN_LEN: usize = 80;

/// Minimum number of blocks a bond stays locked after unlocking.
pub const MIN_LOCK_TIME: u16 = 6;

const SECRET_KEY_LEN: usize = 32;
const HEADER_LEN: usize = 2;

/// Protocol tag, byte 0 of every commitment.
///
/// Change-param, generic, bonded-role, confiscation and remove-asset
/// proposals all commit under [`OpReturnType::Proposal`]; only the issuance
/// variants have their own tags because their transactions carry an
/// issuance-candidate output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OpReturnType {
    Proposal = 0x10,
    CompensationRequest = 0x11,
    ReimbursementRequest = 0x12,
    BlindVote = 0x13,
    VoteReveal = 0x14,
    Lockup = 0x15,
}

impl OpReturnType {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x10 => Some(Self::Proposal),
            0x11 => Some(Self::CompensationRequest),
            0x12 => Some(Self::ReimbursementRequest),
            0x13 => Some(Self::BlindVote),
            0x14 => Some(Self::VoteReveal),
            0x15 => Some(Self::Lockup),
            _ => None,
        }
    }

    pub fn tag(&self) -> u8 {
        *self as u8
    }

    /// Exact encoded length (header included).
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN
            + match self {
                Self::Proposal
                | Self::CompensationRequest
                | Self::ReimbursementRequest
                | Self::BlindVote => Digest::LEN,
                Self::VoteReveal => SECRET_KEY_LEN + Digest::LEN,
                Self::Lockup => 1 + 2 + Digest::LEN,
            }
    }
}

/// Why a bond was locked up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LockReason {
    BondedRole = 0x01,
    Reputation = 0x02,
}

impl LockReason {
    pub fn from_byte(b: u8) -> Result<Self, OpReturnError> {
        match b {
            0x01 => Ok(Self::BondedRole),
            0x02 => Ok(Self::Reputation),
            other => Err(OpReturnError::UnknownLockReason(other)),
        }
    }
}

/// A decoded commitment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpReturnData {
    Proposal(Digest),
    CompensationRequest(Digest),
    ReimbursementRequest(Digest),
    /// Digest of the encrypted ballot list.
    BlindVote(Digest),
    VoteReveal {
        secret_key: [u8; 32],
        blind_vote_list_digest: Digest,
    },
    Lockup {
        reason: LockReason,
        lock_time: u16,
        bond_hash: Digest,
    },
}

impl OpReturnData {
    pub fn op_return_type(&self) -> OpReturnType {
        match self {
            Self::Proposal(_) => OpReturnType::Proposal,
            Self::CompensationRequest(_) => OpReturnType::CompensationRequest,
            Self::ReimbursementRequest(_) => OpReturnType::ReimbursementRequest,
            Self::BlindVote(_) => OpReturnType::BlindVote,
            Self::VoteReveal { .. } => OpReturnType::VoteReveal,
            Self::Lockup { .. } => OpReturnType::Lockup,
        }
    }

    /// The committed digest for proposal and blind-vote commitments.
    pub fn commitment(&self) -> Option<&Digest> {
        match self {
            Self::Proposal(d)
            | Self::CompensationRequest(d)
            | Self::ReimbursementRequest(d)
            | Self::BlindVote(d) => Some(d),
            Self::VoteReveal { .. } | Self::Lockup { .. } => None,
        }
    }
}

/// Serialize a commitment with the current protocol version.
pub fn encode(data: &OpReturnData) -> Vec<u8> {
    let ty = data.op_return_type();
    let mut out = Vec::with_capacity(ty.encoded_len());
    out.push(ty.tag());
    out.push(DAO_PROTOCOL_VERSION);
    match data {
        OpReturnData::Proposal(d)
        | OpReturnData::CompensationRequest(d)
        | OpReturnData::ReimbursementRequest(d)
        | OpReturnData::BlindVote(d) => out.extend_from_slice(d.as_bytes()),
        OpReturnData::VoteReveal {
            secret_key,
            blind_vote_list_digest,
        } => {
            out.extend_from_slice(secret_key);
            out.extend_from_slice(blind_vote_list_digest.as_bytes());
        }
        OpReturnData::Lockup {
            reason,
            lock_time,
            bond_hash,
        } => {
            out.push(*reason as u8);
            out.extend_from_slice(&lock_time.to_be_bytes());
            out.extend_from_slice(bond_hash.as_bytes());
        }
    }
    out
}

/// Read the protocol tag without validating the rest of the payload.
pub fn peek_type(bytes: &[u8]) -> Option<OpReturnType> {
    bytes.first().copied().and_then(OpReturnType::from_tag)
}

/// Decode and validate a commitment.
pub fn decode(bytes: &[u8]) -> Result<OpReturnData, OpReturnError> {
    if bytes.len() > MAX_OP_RETURN_LEN {
        return Err(OpReturnError::TooLarge(bytes.len()));
    }
    let (&tag, rest) = bytes.split_first().ok_or(OpReturnError::Empty)?;
    let ty = OpReturnType::from_tag(tag).ok_or(OpReturnError::UnknownTag(tag))?;
    if bytes.len() != ty.encoded_len() {
        return Err(OpReturnError::InvalidLength {
            tag,
            expected: ty.encoded_len(),
            actual: bytes.len(),
        });
    }
    let version = rest[0];
    if !is_compatible(version) {
        return Err(OpReturnError::UnsupportedVersion { tag, version });
    }
    let payload = &rest[1..];

    // Lengths were checked above, so the slice conversions cannot fail.
    let digest_at = |offset: usize| {
        Digest::from_slice(&payload[offset..offset + Digest::LEN]).map_err(|_| {
            OpReturnError::InvalidLength {
                tag,
                expected: ty.encoded_len(),
                actual: bytes.len(),
            }
        })
    };

    Ok(match ty {
        OpReturnType::Proposal => OpReturnData::Proposal(digest_at(0)?),
        OpReturnType::CompensationRequest => OpReturnData::CompensationRequest(digest_at(0)?),
        OpReturnType::ReimbursementRequest => OpReturnData::ReimbursementRequest(digest_at(0)?),
        OpReturnType::BlindVote => OpReturnData::BlindVote(digest_at(0)?),
        OpReturnType::VoteReveal => {
            let mut secret_key = [0u8; SECRET_KEY_LEN];
            secret_key.copy_from_slice(&payload[..SECRET_KEY_LEN]);
            OpReturnData::VoteReveal {
                secret_key,
                blind_vote_list_digest: digest_at(SECRET_KEY_LEN)?,
            }
        }
        OpReturnType::Lockup => {
            let reason = LockReason::from_byte(payload[0])?;
            let lock_time = u16::from_be_bytes([payload[1], payload[2]]);
            if lock_time < MIN_LOCK_TIME {
                return Err(OpReturnError::LockTimeTooShort(lock_time));
            }
            OpReturnData::Lockup {
                reason,
                lock_time,
                bond_hash: digest_at(3)?,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(b: u8) -> Digest {
        Digest::new([b; 20])
    }

    #[test]
    fn proposal_layout() {
        let bytes = encode(&OpReturnData::Proposal(digest(0xAA)));
        assert_eq!(bytes.len(), 22);
        assert_eq!(bytes[0], 0x10);
        assert_eq!(bytes[1], DAO_PROTOCOL_VERSION);
        assert_eq!(&bytes[2..], &[0xAA; 20]);
    }

    #[test]
    fn reveal_puts_key_before_digest() {
        let data = OpReturnData::VoteReveal {
            secret_key: [0x11; 32],
            blind_vote_list_digest: digest(0x22),
        };
        let bytes = encode(&data);
        assert_eq!(bytes.len(), 54);
        assert_eq!(&bytes[2..34], &[0x11; 32]);
        assert_eq!(&bytes[34..], &[0x22; 20]);
        assert_eq!(decode(&bytes).unwrap(), data);
    }

    #[test]
    fn lockup_roundtrip() {
        let data = OpReturnData::Lockup {
            reason: LockReason::BondedRole,
            lock_time: 0x0102,
            bond_hash: digest(3),
        };
        let bytes = encode(&data);
        assert_eq!(&bytes[2..5], &[0x01, 0x01, 0x02]);
        assert_eq!(decode(&bytes).unwrap(), data);
    }

    #[test]
    fn rejects_unknown_tag_and_version() {
        let mut bytes = encode(&OpReturnData::BlindVote(digest(1)));
        bytes[1] = 9;
        assert_eq!(
            decode(&bytes),
            Err(OpReturnError::UnsupportedVersion { tag: 0x13, version: 9 })
        );
        bytes[0] = 0x7F;
        assert_eq!(decode(&bytes), Err(OpReturnError::UnknownTag(0x7F)));
        assert_eq!(decode(&[]), Err(OpReturnError::Empty));
    }

    #[test]
    fn rejects_truncated_payload() {
        let bytes = encode(&OpReturnData::CompensationRequest(digest(1)));
        let err = decode(&bytes[..21]).unwrap_err();
        assert_eq!(
            err,
            OpReturnError::InvalidLength {
                tag: 0x11,
                expected: 22,
                actual: 21
            }
        );
    }

    #[test]
    fn rejects_short_lock_time() {
        let bytes = encode(&OpReturnData::Lockup {
            reason: LockReason::Reputation,
            lock_time: 2,
            bond_hash: digest(3),
        });
        assert_eq!(decode(&bytes), Err(OpReturnError::LockTimeTooShort(2)));
    }

    #[test]
    fn peek_reads_tag_only() {
        assert_eq!(peek_type(&[0x14]), Some(OpReturnType::VoteReveal));
        assert_eq!(peek_type(&[0x00, 1, 2]), None);
    }
}
