//! Block-level parsing: genesis detection and same-block dependency
//! resolution.

use crate::error::ParseError;
use crate::raw::{RawBlock, RawTx};
use crate::tx_parser::TxParser;
use crate::utxo::BlockUtxo;
use dao_ledger::{Block, GenesisConfig, Ledger, Tx, TxInput, TxOutput, TxBlock};
use dao_period::PeriodEngine;
use dao_types::{TxId, TxOutputKey, TxOutputType, TxType};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Largest base-chain block, in bytes.
pub const MAX_BLOCK_SIZE: usize = 1_000_000;

/// Smallest possible transaction, in bytes.
pub const MIN_TX_SIZE: usize = 188;

/// Upper bound on resolution passes: each productive pass resolves at least
/// one transaction.
pub const MAX_TXS_PER_BLOCK: usize = MAX_BLOCK_SIZE / MIN_TX_SIZE;

/// Parses blocks against the ledger and period engine at the block's height.
pub struct BlockParser<'a> {
    ledger: &'a Ledger,
    period: &'a PeriodEngine,
}

impl<'a> BlockParser<'a> {
    pub fn new(ledger: &'a Ledger, period: &'a PeriodEngine) -> Self {
        Self { ledger, period }
    }

    /// Full-node variant.
    pub fn parse_block(&self, raw: &RawBlock) -> Result<TxBlock, ParseError> {
        self.ledger.check_connects(raw.height, &raw.previous_hash)?;
        if self.period.chain_height() != Some(raw.height) {
            return Err(ParseError::PeriodNotAdvanced {
                height: raw.height,
                engine: self.period.chain_height(),
            });
        }

        let mut utxo = BlockUtxo::new(self.ledger);
        let mut resolved: Vec<(usize, Tx)> = Vec::new();
        let mut pending: Vec<(usize, &RawTx)> = raw.txs.iter().enumerate().collect();

        let genesis = self.ledger.genesis();
        if raw.height == genesis.block_height {
            let pos = pending
                .iter()
                .position(|(_, tx)| tx.id == genesis.tx_id)
                .ok_or(ParseError::GenesisTxNotFound {
                    height: raw.height,
                    tx_id: genesis.tx_id,
                })?;
            let (block_pos, raw_tx) = pending.remove(pos);
            let tx = parse_genesis_tx(raw_tx, genesis, raw)?;
            utxo.apply(&tx);
            resolved.push((block_pos, tx));
        }

        let parser = TxParser::new(self.ledger, self.period, raw.height, raw.time);
        let passes = resolve(&parser, &mut utxo, pending, &mut resolved);
        resolved.sort_by_key(|(pos, _)| *pos);

        let txs: Vec<Tx> = resolved.into_iter().map(|(_, tx)| tx).collect();
        info!(height = raw.height, raw_txs = raw.txs.len(), bsq_txs = txs.len(), passes, "block parsed");
        Ok(TxBlock {
            height: raw.height,
            time: raw.time,
            hash: raw.hash,
            previous_hash: raw.previous_hash,
            txs,
        })
    }

    /// Lite-node variant: re-derive `received` from its raw content and
    /// reject it on any difference.
    pub fn parse_lite_block(&self, received: &Block) -> Result<TxBlock, ParseError> {
        let parsed = self.parse_block(&RawBlock::from(received))?;
        if !received.matches(&parsed) {
            warn!(height = received.height, hash = %received.hash, "lite block differs from local parse");
            return Err(ParseError::LiteBlockMismatch {
                height: received.height,
            });
        }
        Ok(parsed)
    }
}

/// Work-list resolution. A transaction is ready once none of its inputs
/// refer to a still-unresolved transaction of the same block; resolving it
/// updates `utxo` immediately, so later transactions of the same pass see
/// its outputs. Returns the number of passes made.
fn resolve<'r>(
    parser: &TxParser<'_>,
    utxo: &mut BlockUtxo<'_>,
    mut pending: Vec<(usize, &'r RawTx)>,
    resolved: &mut Vec<(usize, Tx)>,
) -> usize {
    let mut unresolved: BTreeSet<TxId> = pending.iter().map(|(_, tx)| tx.id).collect();
    let mut passes = 0;
    while !pending.is_empty() && passes < MAX_TXS_PER_BLOCK {
        passes += 1;
        let before = pending.len();
        let mut blocked = Vec::new();
        for (pos, raw) in pending {
            let waiting = raw
                .inputs
                .iter()
                .any(|i| i.tx_id != raw.id && unresolved.contains(&i.tx_id));
            if waiting {
                blocked.push((pos, raw));
                continue;
            }
            unresolved.remove(&raw.id);
            if let Some(tx) = parser.parse(raw, utxo) {
                debug!(tx_id = %tx.id, tx_type = ?tx.tx_type, pass = passes, "tx resolved");
                utxo.apply(&tx);
                resolved.push((pos, tx));
            }
        }
        pending = blocked;
        if pending.len() == before {
            break;
        }
    }
    if !pending.is_empty() {
        warn!(unresolved = pending.len(), passes, "circular same-block dependencies left unresolved");
    }
    passes
}

/// Every output of the genesis tx is an issuance of the configured supply.
fn parse_genesis_tx(raw: &RawTx, genesis: &GenesisConfig, block: &RawBlock) -> Result<Tx, ParseError> {
    let actual: u64 = raw.outputs.iter().map(|o| o.value).sum();
    if actual != genesis.total_supply {
        return Err(ParseError::InvalidGenesisTx {
            tx_id: raw.id,
            expected: genesis.total_supply,
            actual,
        });
    }
    info!(tx_id = %raw.id, outputs = raw.outputs.len(), supply = actual, "genesis tx found");
    Ok(Tx {
        id: raw.id,
        block_height: block.height,
        time: block.time,
        inputs: raw
            .inputs
            .iter()
            .map(|i| TxInput { connected: i.key() })
            .collect(),
        outputs: raw
            .outputs
            .iter()
            .map(|o| TxOutput {
                key: TxOutputKey::new(raw.id, o.index),
                value: o.value,
                address: o.address.clone(),
                op_return_data: o.op_return_data.clone(),
                block_height: block.height,
                output_type: TxOutputType::GenesisOutput,
                lock_time: None,
                unlock_block_height: None,
            })
            .collect(),
        tx_type: TxType::Genesis,
        burnt_fee: 0,
    })
}
