use dao_governance::{GovernanceError, WalletError};
use dao_ledger::LedgerError;
use dao_network::NetworkError;
use dao_parser::ParseError;
use dao_period::PeriodError;
use dao_voting::VotingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("period error: {0}")]
    Period(#[from] PeriodError),

    #[error("governance error: {0}")]
    Governance(#[from] GovernanceError),

    #[error("voting error: {0}")]
    Voting(#[from] VotingError),

    #[error("wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("logging error: {0}")]
    Logging(String),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no wallet configured")]
    NoWallet,

    /// Lite nodes receive blocks from peers, full nodes from the daemon.
    #[error("operation needs a {0} node")]
    WrongMode(&'static str),

    #[error("gave up after {0} re-derivations in one sync")]
    TooManyReorgs(u32),
}

impl NodeError {
    /// Whether processing can only continue after re-deriving the chain
    /// from an earlier snapshot.
    pub fn requires_reorg(&self) -> bool {
        matches!(self, Self::Parse(err) if err.requires_reorg())
    }

    /// Height of the block that caused a chain-integrity failure.
    pub fn failed_height(&self) -> Option<u64> {
        match self {
            Self::Parse(ParseError::BlockNotConnecting { height, .. })
            | Self::Parse(ParseError::LiteBlockMismatch { height }) => Some(*height),
            _ => None,
        }
    }
}
