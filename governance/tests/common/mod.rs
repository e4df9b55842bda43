#![allow(dead_code)]

use dao_governance::{SignedTx, WalletError, WalletService};
use dao_ledger::{Block, GenesisConfig, Ledger};
use dao_parser::{BlockParser, ParseError, RawBlock, RawTx, RawTxInput, RawTxOutput};
use dao_period::{collect_events, DaoView, PeriodEngine, StateChangeProvider};
use dao_types::{BlockHash, NetworkId, Timestamp, TxId, TxOutputKey};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

// regtest cycle from GENESIS: proposal 10..=13, break1 14, blind vote 15..=16,
// break2 17, reveal 18..=19, break3 20, result 21..=22, break4 23
pub const GENESIS: u64 = 10;

pub fn id(n: u16) -> TxId {
    let mut bytes = [0u8; 32];
    bytes[..2].copy_from_slice(&n.to_be_bytes());
    bytes[31] = 0xCC;
    TxId::new(bytes)
}

fn block_hash(height: u64) -> BlockHash {
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&height.to_be_bytes());
    BlockHash::new(bytes)
}

pub struct Chain {
    pub ledger: Ledger,
    pub period: PeriodEngine,
}

impl Chain {
    /// Genesis at height 10 paying 600k and 400k BSQ from tx `id(1)`.
    pub fn with_genesis() -> Self {
        let mut config = GenesisConfig::for_network(NetworkId::Regtest);
        config.tx_id = id(1);
        config.block_height = GENESIS;
        config.total_supply = 1_000_000;
        let mut chain = Self {
            ledger: Ledger::new(config),
            period: PeriodEngine::new(),
        };
        let genesis = RawTx {
            id: id(1),
            inputs: vec![RawTxInput { tx_id: id(0), index: 0 }],
            outputs: vec![out(0, 600_000), out(1, 400_000)],
        };
        chain.append(vec![genesis], &mut []).unwrap();
        chain
    }

    pub fn view(&self) -> DaoView<'_> {
        DaoView::new(&self.ledger, &self.period)
    }

    pub fn append(
        &mut self,
        txs: Vec<RawTx>,
        providers: &mut [&mut dyn StateChangeProvider],
    ) -> Result<Block, ParseError> {
        let height = self.ledger.next_height();
        let raw = RawBlock {
            height,
            time: Timestamp::new(1_600_000_000 + height * 600),
            hash: block_hash(height),
            previous_hash: self.ledger.head_hash().unwrap_or(BlockHash::ZERO),
            txs,
        };
        self.period.on_new_height(height, &self.ledger)?;
        let tx_block = BlockParser::new(&self.ledger, &self.period).parse_block(&raw)?;
        let period = &self.period;
        let block = self.ledger.append_block(tx_block, |ledger, block| {
            collect_events(providers, &DaoView::new(ledger, period), block)
        })?;
        Ok(block.clone())
    }

    /// Append empty blocks until the next block is at `height`.
    pub fn advance_to(&mut self, height: u64, providers: &mut [&mut dyn StateChangeProvider]) {
        while self.ledger.next_height() < height {
            self.append(vec![], providers).unwrap();
        }
    }
}

pub fn out(index: u32, value: u64) -> RawTxOutput {
    RawTxOutput {
        index,
        value,
        address: None,
        op_return_data: None,
    }
}

/// Builds raw transactions from a single BSQ coin and keeps them for the
/// test to put into blocks.
pub struct TestWallet {
    coins: RefCell<BTreeMap<TxOutputKey, u64>>,
    next_id: Cell<u16>,
    built: RefCell<Vec<RawTx>>,
}

impl TestWallet {
    pub fn new(coin: TxOutputKey, value: u64, first_id: u16) -> Self {
        Self {
            coins: RefCell::new(BTreeMap::from([(coin, value)])),
            next_id: Cell::new(first_id),
            built: RefCell::new(Vec::new()),
        }
    }

    pub fn take_built(&self) -> Vec<RawTx> {
        std::mem::take(&mut *self.built.borrow_mut())
    }

    /// Spend `spend` into `outputs` plus an OP_RETURN; `outputs[change]`
    /// becomes the wallet's coin.
    fn build(&self, spend: TxOutputKey, outputs: Vec<u64>, change: usize, op_return: &[u8]) -> SignedTx {
        let tx_id = id(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);

        let mut raw_outputs: Vec<RawTxOutput> = outputs
            .iter()
            .enumerate()
            .map(|(i, v)| out(i as u32, *v))
            .collect();
        raw_outputs.push(RawTxOutput {
            index: outputs.len() as u32,
            value: 0,
            address: None,
            op_return_data: Some(op_return.to_vec()),
        });

        let mut coins = self.coins.borrow_mut();
        coins.remove(&spend);
        coins.insert(TxOutputKey::new(tx_id, change as u32), outputs[change]);
        let raw = RawTx {
            id: tx_id,
            inputs: vec![RawTxInput {
                tx_id: spend.tx_id,
                index: spend.index,
            }],
            outputs: raw_outputs,
        };
        let bytes = bincode::serialize(&raw).unwrap();
        self.built.borrow_mut().push(raw);
        SignedTx { tx_id, bytes }
    }

    fn largest_coin(&self, need: u64) -> Result<(TxOutputKey, u64), WalletError> {
        let coins = self.coins.borrow();
        let (key, value) = coins
            .iter()
            .max_by_key(|(_, v)| **v)
            .map(|(k, v)| (*k, *v))
            .unwrap_or((TxOutputKey::new(id(0), 0), 0));
        if value < need {
            return Err(WalletError::InsufficientBsq { need, have: value });
        }
        Ok((key, value))
    }
}

impl WalletService for TestWallet {
    fn build_fee_tx(&self, fee: u64, op_return: &[u8]) -> Result<SignedTx, WalletError> {
        let (coin, value) = self.largest_coin(fee)?;
        Ok(self.build(coin, vec![value - fee], 0, op_return))
    }

    fn build_issuance_request_tx(
        &self,
        fee: u64,
        requested: u64,
        op_return: &[u8],
    ) -> Result<SignedTx, WalletError> {
        let (coin, value) = self.largest_coin(fee)?;
        Ok(self.build(coin, vec![value - fee, requested], 0, op_return))
    }

    fn build_stake_tx(&self, stake: u64, fee: u64, op_return: &[u8]) -> Result<SignedTx, WalletError> {
        let (coin, value) = self.largest_coin(stake + fee)?;
        Ok(self.build(coin, vec![stake, value - stake - fee], 1, op_return))
    }

    fn build_spend_tx(&self, output: TxOutputKey, _op_return: &[u8]) -> Result<SignedTx, WalletError> {
        Err(WalletError::OutputNotOwned(output))
    }
}
