//! Proposal payloads and their variants.

use crate::store::ContentHash;
use dao_crypto::{digest, sign_message, verify_signature};
use dao_protocol::{OpReturnData, OpReturnType};
use dao_types::{Digest, Param, PrivateKey, PublicKey, Signature, Timestamp, TxId, TxType};
use serde::{Deserialize, Serialize};

/// What a proposal asks for. Selects the quorum and threshold parameters and
/// the on-chain transaction shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalKind {
    CompensationRequest { requested: u64 },
    ReimbursementRequest { requested: u64 },
    ChangeParam { param: Param, value: u64 },
    /// Required bond is `bond_units * BondedRoleFactor`.
    BondedRole { role: String, bond_units: u64 },
    ConfiscateBond { lockup_tx_id: TxId },
    RemoveAsset { ticker: String },
    Generic,
}

impl ProposalKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CompensationRequest { .. } => "compensation_request",
            Self::ReimbursementRequest { .. } => "reimbursement_request",
            Self::ChangeParam { .. } => "change_param",
            Self::BondedRole { .. } => "bonded_role",
            Self::ConfiscateBond { .. } => "confiscate_bond",
            Self::RemoveAsset { .. } => "remove_asset",
            Self::Generic => "generic",
        }
    }

    pub fn quorum_param(&self) -> Param {
        match self {
            Self::CompensationRequest { .. } => Param::QuorumCompRequest,
            Self::ReimbursementRequest { .. } => Param::QuorumReimbursement,
            Self::ChangeParam { .. } => Param::QuorumChangeParam,
            Self::BondedRole { .. } => Param::QuorumBondedRole,
            Self::ConfiscateBond { .. } => Param::QuorumConfiscation,
            Self::RemoveAsset { .. } => Param::QuorumRemoveAsset,
            Self::Generic => Param::QuorumGeneric,
        }
    }

    pub fn threshold_param(&self) -> Param {
        match self {
            Self::CompensationRequest { .. } => Param::ThresholdCompRequest,
            Self::ReimbursementRequest { .. } => Param::ThresholdReimbursement,
            Self::ChangeParam { .. } => Param::ThresholdChangeParam,
            Self::BondedRole { .. } => Param::ThresholdBondedRole,
            Self::ConfiscateBond { .. } => Param::ThresholdConfiscation,
            Self::RemoveAsset { .. } => Param::ThresholdRemoveAsset,
            Self::Generic => Param::ThresholdGeneric,
        }
    }

    pub fn op_return_type(&self) -> OpReturnType {
        match self {
            Self::CompensationRequest { .. } => OpReturnType::CompensationRequest,
            Self::ReimbursementRequest { .. } => OpReturnType::ReimbursementRequest,
            _ => OpReturnType::Proposal,
        }
    }

    /// Type the parser assigns to a valid fee transaction of this kind.
    pub fn tx_type(&self) -> TxType {
        match self {
            Self::CompensationRequest { .. } => TxType::CompensationRequest,
            Self::ReimbursementRequest { .. } => TxType::ReimbursementRequest,
            _ => TxType::Proposal,
        }
    }

    /// Requested issuance, for the issuance variants.
    pub fn requested_amount(&self) -> Option<u64> {
        match self {
            Self::CompensationRequest { requested } | Self::ReimbursementRequest { requested } => {
                Some(*requested)
            }
            _ => None,
        }
    }

    pub(crate) fn commitment_op_return(&self, digest: Digest) -> OpReturnData {
        match self {
            Self::CompensationRequest { .. } => OpReturnData::CompensationRequest(digest),
            Self::ReimbursementRequest { .. } => OpReturnData::ReimbursementRequest(digest),
            _ => OpReturnData::Proposal(digest),
        }
    }
}

/// Immutable proposal content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub uid: String,
    pub name: String,
    pub description: String,
    pub link: String,
    pub owner: PublicKey,
    pub created_at: Timestamp,
    /// Fee transaction; set once the wallet has built it.
    pub tx_id: Option<TxId>,
    pub kind: ProposalKind,
}

impl Proposal {
    /// Digest committed in the fee transaction's OP_RETURN. Covers
    /// everything but the tx id, which is unknown when the commitment is
    /// built.
    pub fn commitment_digest(&self) -> Result<Digest, bincode::Error> {
        let unstamped = Proposal {
            tx_id: None,
            ..self.clone()
        };
        Ok(digest(&bincode::serialize(&unstamped)?))
    }

    pub fn op_return_data(&self) -> Result<OpReturnData, bincode::Error> {
        Ok(self.kind.commitment_op_return(self.commitment_digest()?))
    }
}

/// A proposal as sent over the network: content plus the owner's signature
/// over its bincode encoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalPayload {
    pub proposal: Proposal,
    pub signature: Signature,
}

impl ProposalPayload {
    pub fn sign(proposal: Proposal, private_key: &PrivateKey) -> Result<Self, bincode::Error> {
        let signature = sign_message(&bincode::serialize(&proposal)?, private_key);
        Ok(Self {
            proposal,
            signature,
        })
    }

    pub fn verify(&self) -> Result<bool, bincode::Error> {
        let bytes = bincode::serialize(&self.proposal)?;
        Ok(verify_signature(&bytes, &self.signature, &self.proposal.owner))
    }

    pub fn tx_id(&self) -> Option<TxId> {
        self.proposal.tx_id
    }
}

impl ContentHash for ProposalPayload {
    fn content_hash(&self) -> Result<Digest, bincode::Error> {
        Ok(digest(&bincode::serialize(self)?))
    }
}
