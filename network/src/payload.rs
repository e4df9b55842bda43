//! Governance payloads exchanged between peers.
//!
//! Two store semantics exist on the network: a hash-map store whose entries
//! the owner may remove (preliminary proposals), and an append-only store
//! whose entries are durable once added (confirmed proposals, blind votes).

use crate::error::NetworkError;
use dao_governance::{ContentHash, ProposalPayload};
use dao_types::Digest;
use dao_voting::BlindVotePayload;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StoreKind {
    HashMap,
    AppendOnly,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PayloadKind {
    Proposal,
    ConfirmedProposal,
    BlindVote,
}

impl PayloadKind {
    pub fn store(self) -> StoreKind {
        match self {
            Self::Proposal => StoreKind::HashMap,
            Self::ConfirmedProposal | Self::BlindVote => StoreKind::AppendOnly,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DaoPayload {
    Proposal(ProposalPayload),
    ConfirmedProposal(ProposalPayload),
    BlindVote(BlindVotePayload),
}

impl DaoPayload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Self::Proposal(_) => PayloadKind::Proposal,
            Self::ConfirmedProposal(_) => PayloadKind::ConfirmedProposal,
            Self::BlindVote(_) => PayloadKind::BlindVote,
        }
    }

    pub fn content_hash(&self) -> Result<Digest, NetworkError> {
        let hash = match self {
            Self::Proposal(p) | Self::ConfirmedProposal(p) => p.content_hash()?,
            Self::BlindVote(b) => b.content_hash()?,
        };
        Ok(hash)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, NetworkError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, NetworkError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// A change in a peer-network store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PayloadEvent {
    Added(DaoPayload),
    /// Only hash-map entries can be removed.
    Removed(DaoPayload),
}
