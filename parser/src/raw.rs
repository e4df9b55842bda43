//! Raw block data as delivered by the chain daemon.

use dao_ledger::{Block, Tx};
use dao_types::{BlockHash, Timestamp, TxId, TxOutputKey};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBlock {
    pub height: u64,
    pub time: Timestamp,
    pub hash: BlockHash,
    pub previous_hash: BlockHash,
    /// Block order.
    pub txs: Vec<RawTx>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTx {
    pub id: TxId,
    pub inputs: Vec<RawTxInput>,
    pub outputs: Vec<RawTxOutput>,
}

/// The output an input spends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTxInput {
    pub tx_id: TxId,
    pub index: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTxOutput {
    pub index: u32,
    pub value: u64,
    pub address: Option<String>,
    pub op_return_data: Option<Vec<u8>>,
}

impl RawTxInput {
    pub fn key(&self) -> TxOutputKey {
        TxOutputKey::new(self.tx_id, self.index)
    }
}

impl RawTx {
    /// OP_RETURN bytes of the last output, if it carries any.
    pub fn op_return_data(&self) -> Option<&[u8]> {
        self.outputs.last()?.op_return_data.as_deref()
    }
}

impl From<&Tx> for RawTx {
    fn from(tx: &Tx) -> Self {
        Self {
            id: tx.id,
            inputs: tx
                .inputs
                .iter()
                .map(|i| RawTxInput {
                    tx_id: i.connected.tx_id,
                    index: i.connected.index,
                })
                .collect(),
            outputs: tx
                .outputs
                .iter()
                .map(|o| RawTxOutput {
                    index: o.index(),
                    value: o.value,
                    address: o.address.clone(),
                    op_return_data: o.op_return_data.clone(),
                })
                .collect(),
        }
    }
}

/// Strip a classified block back to its raw form, for lite-node re-parsing.
impl From<&Block> for RawBlock {
    fn from(block: &Block) -> Self {
        Self {
            height: block.height,
            time: block.time,
            hash: block.hash,
            previous_hash: block.previous_hash,
            txs: block.txs.iter().map(RawTx::from).collect(),
        }
    }
}
