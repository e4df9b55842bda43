use dao_types::{BlockHash, TxId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("block at height {height} does not follow chain head {expected}")]
    UnexpectedHeight { height: u64, expected: u64 },

    #[error("block {height} does not connect: previous hash {previous} != head {head}")]
    NotConnecting {
        height: u64,
        previous: BlockHash,
        head: BlockHash,
    },

    #[error("first block must be the genesis block at height {genesis_height}, got {height}")]
    NotGenesis { height: u64, genesis_height: u64 },

    #[error("duplicate transaction {0}")]
    DuplicateTx(TxId),

    #[error("snapshot hash mismatch at height {0}")]
    SnapshotCorrupt(u64),

    #[error("snapshot encoding: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),
}
