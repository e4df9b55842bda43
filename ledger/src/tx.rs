//! Classified transactions as stored in the ledger.

use dao_types::{Timestamp, TxId, TxOutputKey, TxOutputType, TxType};
use serde::{Deserialize, Serialize};

/// A transaction input, identified by the output it spends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub connected: TxOutputKey,
}

/// A classified transaction output.
///
/// Value and owner never change after parsing; only classification metadata
/// (kept in the ledger's side maps) evolves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub key: TxOutputKey,
    /// Satoshis.
    pub value: u64,
    pub address: Option<String>,
    /// Raw OP_RETURN bytes, present only on the commitment output.
    pub op_return_data: Option<Vec<u8>>,
    pub block_height: u64,
    pub output_type: TxOutputType,
    /// Bond lock time in blocks, set on lockup and unlock outputs.
    pub lock_time: Option<u16>,
    /// Height from which an unlock output may be spent.
    pub unlock_block_height: Option<u64>,
}

impl TxOutput {
    pub fn tx_id(&self) -> TxId {
        self.key.tx_id
    }

    pub fn index(&self) -> u32 {
        self.key.index
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tx {
    pub id: TxId,
    pub block_height: u64,
    pub time: Timestamp,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub tx_type: TxType,
    /// BSQ inputs minus BSQ outputs, in satoshis. For invalid transactions
    /// this is the whole BSQ input.
    pub burnt_fee: u64,
}

impl Tx {
    /// The OP_RETURN commitment output, always the last output when present.
    pub fn op_return_output(&self) -> Option<&TxOutput> {
        self.outputs
            .last()
            .filter(|o| o.op_return_data.is_some())
    }

    pub fn op_return_data(&self) -> Option<&[u8]> {
        self.op_return_output()
            .and_then(|o| o.op_return_data.as_deref())
    }

    pub fn output(&self, index: u32) -> Option<&TxOutput> {
        self.outputs.get(index as usize)
    }

    pub fn is_invalid(&self) -> bool {
        self.tx_type == TxType::Invalid
    }
}
