use dao_types::{Param, Phase, TxId, TxType};
use thiserror::Error;

/// A received or locally built payload failed validation. The payload is
/// dropped; processing of everything else continues.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("field {0} must not be empty")]
    EmptyField(&'static str),

    #[error("field {field} exceeds {max} characters")]
    FieldTooLong { field: &'static str, max: usize },

    #[error("requested amount {amount} outside [{min}, {max}]")]
    AmountOutOfRange { amount: u64, min: u64, max: u64 },

    #[error("parameter {0} cannot be changed by vote")]
    ParamNotGovernable(Param),

    #[error("value {value} outside the domain of {param}")]
    ParamOutOfDomain { param: Param, value: u64 },

    #[error("{param}: {value} is more than a factor of two from {current}")]
    ParamChangeTooLarge { param: Param, current: u64, value: u64 },

    #[error("{param} already has value {value}")]
    ParamUnchanged { param: Param, value: u64 },

    #[error("bonded role needs a name and a positive bond")]
    InvalidBondedRole,

    #[error("{0} is not a lockup tx")]
    UnknownLockup(TxId),

    #[error("bond {0} already confiscated")]
    AlreadyConfiscated(TxId),

    #[error("asset {0} already removed")]
    AssetAlreadyRemoved(String),

    #[error("signature does not match the owner key")]
    InvalidSignature,

    #[error("proposals are accepted in the proposal phase, current phase is {0}")]
    NotInProposalPhase(Phase),

    #[error("tx {tx_id} at height {height} is not in this cycle's proposal phase")]
    TxNotInProposalPhase { tx_id: TxId, height: u64 },

    #[error("tx {tx_id} has type {actual:?}, expected {expected:?}")]
    TxTypeMismatch {
        tx_id: TxId,
        expected: TxType,
        actual: TxType,
    },

    #[error("OP_RETURN of {0} does not commit to this proposal")]
    CommitmentMismatch(TxId),

    #[error("proposal has no tx id")]
    MissingTxId,

    #[error("encoding error: {0}")]
    Encoding(String),
}

impl From<bincode::Error> for ValidationError {
    fn from(err: bincode::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("proposal {0} not found")]
    ProposalNotFound(String),

    /// An operation broke a lifecycle rule its caller must uphold, such as
    /// removing a proposal after its proposal phase ended. The state is left
    /// unchanged.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("wallet error: {0}")]
    Wallet(#[from] crate::wallet::WalletError),

    #[error("encoding error: {0}")]
    Encoding(#[from] bincode::Error),
}
