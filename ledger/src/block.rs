//! Parsed blocks.

use crate::event::StateChangeEvent;
use crate::tx::Tx;
use dao_types::{BlockHash, Timestamp};
use serde::{Deserialize, Serialize};

/// Parser output: a block header plus its resolved BSQ transactions in
/// block order. Carries no events yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxBlock {
    pub height: u64,
    pub time: Timestamp,
    pub hash: BlockHash,
    pub previous_hash: BlockHash,
    pub txs: Vec<Tx>,
}

/// A block as appended to the ledger. Immutable once appended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub height: u64,
    pub time: Timestamp,
    pub hash: BlockHash,
    pub previous_hash: BlockHash,
    pub txs: Vec<Tx>,
    pub events: Vec<StateChangeEvent>,
}

impl Block {
    pub(crate) fn from_tx_block(tx_block: TxBlock) -> Self {
        Self {
            height: tx_block.height,
            time: tx_block.time,
            hash: tx_block.hash,
            previous_hash: tx_block.previous_hash,
            txs: tx_block.txs,
            events: Vec::new(),
        }
    }

    /// Whether `parsed` is the same header and transaction list as this block.
    /// Events are ignored: they are derived locally at append time.
    pub fn matches(&self, parsed: &TxBlock) -> bool {
        self.height == parsed.height
            && self.time == parsed.time
            && self.hash == parsed.hash
            && self.previous_hash == parsed.previous_hash
            && self.txs == parsed.txs
    }
}
