#![allow(dead_code)]

use dao_ledger::{Block, GenesisConfig, Ledger, TxBlock};
use dao_parser::{BlockParser, ParseError, RawBlock, RawTx, RawTxInput, RawTxOutput};
use dao_period::PeriodEngine;
use dao_protocol::{encode, OpReturnData};
use dao_types::{BlockHash, Digest, NetworkId, Timestamp, TxId};

// regtest cycle from GENESIS: proposal 10..=13, break1 14, blind vote 15..=16,
// break2 17, reveal 18..=19, break3 20, result 21..=22, break4 23
pub const GENESIS: u64 = 10;
pub const SUPPLY: u64 = 1_000_000;

pub fn id(n: u16) -> TxId {
    let mut bytes = [0u8; 32];
    bytes[..2].copy_from_slice(&n.to_be_bytes());
    bytes[31] = 0xAA;
    TxId::new(bytes)
}

pub fn block_hash(height: u64) -> BlockHash {
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&height.to_be_bytes());
    bytes[31] = 0xBB;
    BlockHash::new(bytes)
}

pub fn input(tx_id: TxId, index: u32) -> RawTxInput {
    RawTxInput { tx_id, index }
}

pub fn out(index: u32, value: u64) -> RawTxOutput {
    RawTxOutput {
        index,
        value,
        address: None,
        op_return_data: None,
    }
}

pub fn op_return(index: u32, data: &OpReturnData) -> RawTxOutput {
    RawTxOutput {
        index,
        value: 0,
        address: None,
        op_return_data: Some(encode(data)),
    }
}

pub fn digest(b: u8) -> Digest {
    Digest::new([b; 20])
}

pub fn raw_tx(tx_id: TxId, inputs: Vec<RawTxInput>, outputs: Vec<RawTxOutput>) -> RawTx {
    RawTx {
        id: tx_id,
        inputs,
        outputs,
    }
}

pub fn genesis_tx() -> RawTx {
    raw_tx(
        id(1),
        vec![input(id(0), 0)],
        vec![out(0, 600_000), out(1, 400_000)],
    )
}

pub fn genesis_config() -> GenesisConfig {
    let mut config = GenesisConfig::for_network(NetworkId::Regtest);
    config.tx_id = id(1);
    config.block_height = GENESIS;
    config.total_supply = SUPPLY;
    config
}

pub struct Chain {
    pub ledger: Ledger,
    pub period: PeriodEngine,
}

impl Chain {
    pub fn new() -> Self {
        Self {
            ledger: Ledger::new(genesis_config()),
            period: PeriodEngine::new(),
        }
    }

    /// A chain holding just the genesis block.
    pub fn with_genesis() -> Self {
        let mut chain = Self::new();
        chain.append(vec![genesis_tx()]).unwrap();
        chain
    }

    pub fn raw_block(&self, txs: Vec<RawTx>) -> RawBlock {
        let height = self.ledger.next_height();
        RawBlock {
            height,
            time: Timestamp::new(1_600_000_000 + height * 600),
            hash: block_hash(height),
            previous_hash: self.ledger.head_hash().unwrap_or(BlockHash::ZERO),
            txs,
        }
    }

    pub fn parse(&mut self, raw: &RawBlock) -> Result<TxBlock, ParseError> {
        self.period.on_new_height(raw.height, &self.ledger)?;
        BlockParser::new(&self.ledger, &self.period).parse_block(raw)
    }

    pub fn append_raw(&mut self, raw: &RawBlock) -> Result<Block, ParseError> {
        let tx_block = self.parse(raw)?;
        Ok(self.ledger.append_block(tx_block, |_, _| vec![])?.clone())
    }

    pub fn append(&mut self, txs: Vec<RawTx>) -> Result<Block, ParseError> {
        let raw = self.raw_block(txs);
        self.append_raw(&raw)
    }

    /// Lite-node path: re-derive a block received from a full node.
    pub fn append_lite(&mut self, received: &Block) -> Result<Block, ParseError> {
        self.period.on_new_height(received.height, &self.ledger)?;
        let tx_block = BlockParser::new(&self.ledger, &self.period).parse_lite_block(received)?;
        Ok(self.ledger.append_block(tx_block, |_, _| vec![])?.clone())
    }

    /// Append empty blocks until the next block is at `height`.
    pub fn advance_to(&mut self, height: u64) {
        while self.ledger.next_height() < height {
            self.append(vec![]).unwrap();
        }
    }
}
