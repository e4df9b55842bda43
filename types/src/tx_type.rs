//! Classification tags the parser assigns to transactions and their outputs.

use serde::{Deserialize, Serialize};

/// Classification of a single transaction output.
///
/// Drives eligibility for later protocol stages: only the "BSQ-bearing"
/// variants enter the unspent-output index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxOutputType {
    Undefined,
    GenesisOutput,
    BsqOutput,
    BtcOutput,
    ProposalOpReturn,
    CompReqOpReturn,
    ReimbursementOpReturn,
    IssuanceCandidateOutput,
    BlindVoteLockStakeOutput,
    BlindVoteOpReturn,
    VoteRevealUnlockStakeOutput,
    VoteRevealOpReturn,
    LockupOutput,
    LockupOpReturn,
    UnlockOutput,
    InvalidOutput,
}

impl TxOutputType {
    /// Whether outputs of this type carry BSQ and become spendable once appended.
    ///
    /// Issuance candidates are excluded: they only become BSQ when the
    /// compensation or reimbursement request is accepted by vote.
    pub fn is_bsq_output(&self) -> bool {
        matches!(
            self,
            Self::GenesisOutput
                | Self::BsqOutput
                | Self::BlindVoteLockStakeOutput
                | Self::VoteRevealUnlockStakeOutput
                | Self::LockupOutput
                | Self::UnlockOutput
        )
    }

    pub fn is_op_return(&self) -> bool {
        matches!(
            self,
            Self::ProposalOpReturn
                | Self::CompReqOpReturn
                | Self::ReimbursementOpReturn
                | Self::BlindVoteOpReturn
                | Self::VoteRevealOpReturn
                | Self::LockupOpReturn
        )
    }
}

/// Classification of a whole transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxType {
    Undefined,
    Genesis,
    TransferBsq,
    PayTradeFee,
    Proposal,
    CompensationRequest,
    ReimbursementRequest,
    BlindVote,
    VoteReveal,
    Lockup,
    Unlock,
    Invalid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issuance_candidate_is_not_spendable_bsq() {
        assert!(!TxOutputType::IssuanceCandidateOutput.is_bsq_output());
        assert!(TxOutputType::GenesisOutput.is_bsq_output());
        assert!(TxOutputType::BlindVoteLockStakeOutput.is_bsq_output());
    }

    #[test]
    fn op_return_types_are_never_bsq() {
        for t in [
            TxOutputType::ProposalOpReturn,
            TxOutputType::BlindVoteOpReturn,
            TxOutputType::VoteRevealOpReturn,
            TxOutputType::LockupOpReturn,
        ] {
            assert!(t.is_op_return());
            assert!(!t.is_bsq_output());
        }
    }
}
