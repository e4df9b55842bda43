use dao_crypto::EncryptionError;
use dao_governance::WalletError;
use dao_types::{Digest, Phase, TxId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VotingError {
    #[error("blind votes are accepted in the blind-vote phase, current phase is {0}")]
    NotInBlindVotePhase(Phase),

    #[error("nothing to vote on: no confirmed proposals in this cycle")]
    NoBallots,

    #[error("stake must be positive")]
    ZeroStake,

    #[error("invalid blind vote: {0}")]
    Invalid(#[from] BlindVoteValidationError),

    #[error(transparent)]
    Codec(#[from] VoteCodecError),

    #[error("wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("encoding error: {0}")]
    Encoding(#[from] bincode::Error),
}

/// Failure to encrypt or decrypt a ballot list.
#[derive(Debug, Error)]
pub enum VoteCodecError {
    #[error(transparent)]
    Encryption(#[from] EncryptionError),

    #[error(transparent)]
    Encoding(#[from] bincode::Error),
}

/// Why a blind vote does not count for a cycle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlindVoteValidationError {
    #[error("blind vote carries no encrypted votes")]
    EmptyVotes,

    #[error("blind vote has zero stake")]
    ZeroStake,

    #[error("signature does not match the owner key")]
    InvalidSignature,

    #[error("blind vote tx {0} is not in the ledger")]
    TxNotFound(TxId),

    #[error("tx {0} is not a blind-vote tx")]
    NotABlindVoteTx(TxId),

    #[error("tx {tx_id} at height {height} is not in this cycle's blind-vote phase")]
    WrongCycle { tx_id: TxId, height: u64 },

    #[error("OP_RETURN of {0} does not commit to the encrypted votes")]
    CommitmentMismatch(TxId),

    #[error("stake {claimed} differs from locked output value {locked} in {tx_id}")]
    StakeMismatch { tx_id: TxId, claimed: u64, locked: u64 },

    #[error("tx {tx_id} burnt {actual}, blind-vote fee is {expected}")]
    WrongFee { tx_id: TxId, expected: u64, actual: u64 },

    #[error("encoding error: {0}")]
    Encoding(String),
}

impl From<bincode::Error> for BlindVoteValidationError {
    fn from(err: bincode::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}

/// A reveal that could not be published. Collected on the reveal service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VoteRevealError {
    #[error("blind vote {blind_vote_tx_id}: stake output is spent or unknown")]
    StakeNotFound { blind_vote_tx_id: TxId },

    #[error("blind vote {blind_vote_tx_id}: reveal attempted at {height} outside the reveal window")]
    OutsideRevealWindow { blind_vote_tx_id: TxId, height: u64 },

    #[error("blind vote {blind_vote_tx_id}: wallet error: {source}")]
    Wallet {
        blind_vote_tx_id: TxId,
        #[source]
        source: WalletError,
    },

    #[error("blind vote {blind_vote_tx_id}: encoding error: {message}")]
    Encoding { blind_vote_tx_id: TxId, message: String },
}

impl VoteRevealError {
    pub fn blind_vote_tx_id(&self) -> TxId {
        match self {
            Self::StakeNotFound { blind_vote_tx_id }
            | Self::OutsideRevealWindow { blind_vote_tx_id, .. }
            | Self::Wallet { blind_vote_tx_id, .. }
            | Self::Encoding { blind_vote_tx_id, .. } => *blind_vote_tx_id,
        }
    }
}

/// Why a cycle's tally was not produced.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VoteResultError {
    #[error("local blind-vote list does not match majority digest {majority}")]
    MajorityMismatch { majority: Digest },

    #[error("encoding error: {0}")]
    Encoding(String),
}

impl From<bincode::Error> for VoteResultError {
    fn from(err: bincode::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}
