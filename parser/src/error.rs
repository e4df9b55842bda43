use dao_ledger::LedgerError;
use dao_period::PeriodError;
use dao_types::{BlockHash, TxId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    /// The block does not extend the current chain head. Requires a reorg.
    #[error("block {height} does not connect: previous {previous}, head {head}")]
    BlockNotConnecting {
        height: u64,
        previous: BlockHash,
        head: BlockHash,
    },

    /// A lite-node block differs from the locally derived classification.
    #[error("lite block {height} does not match the locally parsed block")]
    LiteBlockMismatch { height: u64 },

    #[error("genesis tx {tx_id} not found in block {height}")]
    GenesisTxNotFound { height: u64, tx_id: TxId },

    #[error("genesis tx {tx_id} outputs sum to {actual}, expected {expected}")]
    InvalidGenesisTx { tx_id: TxId, expected: u64, actual: u64 },

    #[error("period engine is at {engine:?}, block is {height}")]
    PeriodNotAdvanced { height: u64, engine: Option<u64> },

    #[error("period error: {0}")]
    Period(#[from] PeriodError),

    #[error("ledger error: {0}")]
    Ledger(LedgerError),
}

impl ParseError {
    /// Whether the error can only be resolved by re-deriving the chain from
    /// an earlier snapshot.
    pub fn requires_reorg(&self) -> bool {
        matches!(
            self,
            Self::BlockNotConnecting { .. } | Self::LiteBlockMismatch { .. }
        )
    }
}

impl From<LedgerError> for ParseError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotConnecting {
                height,
                previous,
                head,
            } => Self::BlockNotConnecting {
                height,
                previous,
                head,
            },
            other => Self::Ledger(other),
        }
    }
}
