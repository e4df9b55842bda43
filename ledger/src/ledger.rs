//! The ledger: DAO state plus genesis constants and block listeners.

use crate::block::{Block, TxBlock};
use crate::error::LedgerError;
use crate::event::{IssuanceKind, StateChangeEvent};
use crate::genesis::GenesisConfig;
use crate::listener::BlockListeners;
use crate::snapshot::LedgerSnapshot;
use crate::state::{BondedRoleRecord, DaoState, Issuance, ParamChange, SpentInfo};
use crate::tx::{Tx, TxOutput};
use dao_types::{BlockHash, Param, TxId, TxOutputKey, TxOutputType};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

pub struct Ledger {
    genesis: GenesisConfig,
    state: DaoState,
    listeners: BlockListeners,
}

impl Ledger {
    pub fn new(genesis: GenesisConfig) -> Self {
        Self {
            genesis,
            state: DaoState::default(),
            listeners: BlockListeners::new(),
        }
    }

    pub fn genesis(&self) -> &GenesisConfig {
        &self.genesis
    }

    pub fn state(&self) -> &DaoState {
        &self.state
    }

    pub fn listeners(&self) -> &BlockListeners {
        &self.listeners
    }

    pub fn is_empty(&self) -> bool {
        self.state.blocks.is_empty()
    }

    /// Height of the chain head, `None` before genesis is appended.
    pub fn chain_height(&self) -> Option<u64> {
        self.state.chain_height()
    }

    /// Height the next appended block must have.
    pub fn next_height(&self) -> u64 {
        self.chain_height()
            .map_or(self.genesis.block_height, |h| h + 1)
    }

    pub fn head_hash(&self) -> Option<BlockHash> {
        self.state.head_hash()
    }

    // ── Lookups ──────────────────────────────────────────────────────────

    pub fn get_block(&self, height: u64) -> Option<&Block> {
        self.state.block_at(height)
    }

    /// Blocks from `height` (inclusive) to the chain head.
    pub fn blocks_from(&self, height: u64) -> &[Block] {
        let blocks = &self.state.blocks;
        let start = blocks.partition_point(|b| b.height < height);
        &blocks[start..]
    }

    pub fn get_tx(&self, id: &TxId) -> Option<&Tx> {
        self.state.tx(id)
    }

    pub fn get_tx_output(&self, key: &TxOutputKey) -> Option<&TxOutput> {
        self.get_tx(&key.tx_id)?.output(key.index)
    }

    pub fn get_unspent_output(&self, key: &TxOutputKey) -> Option<&TxOutput> {
        self.state.unspent.get(key)
    }

    pub fn is_unspent(&self, key: &TxOutputKey) -> bool {
        self.state.unspent.contains_key(key)
    }

    pub fn get_tx_output_type(&self, key: &TxOutputKey) -> Option<TxOutputType> {
        self.get_tx_output(key).map(|o| o.output_type)
    }

    pub fn get_spent_info(&self, key: &TxOutputKey) -> Option<&SpentInfo> {
        self.state.spent_info(key)
    }

    /// Value of `param` at `height`: the latest change activated at or below
    /// `height`, otherwise the network default.
    pub fn param_value(&self, param: Param, height: u64) -> u64 {
        self.state
            .param_change_at(param, height)
            .map_or_else(|| param.default_value(self.genesis.network), |c| c.value)
    }

    // ── Append ───────────────────────────────────────────────────────────

    /// Check that a block at `height` with `previous_hash` extends the head.
    pub fn check_connects(&self, height: u64, previous_hash: &BlockHash) -> Result<(), LedgerError> {
        match self.head_hash() {
            None if height != self.genesis.block_height => Err(LedgerError::NotGenesis {
                height,
                genesis_height: self.genesis.block_height,
            }),
            None => Ok(()),
            Some(head) => {
                let expected = self.next_height();
                if height != expected {
                    return Err(LedgerError::UnexpectedHeight { height, expected });
                }
                if *previous_hash != head {
                    return Err(LedgerError::NotConnecting {
                        height,
                        previous: *previous_hash,
                        head,
                    });
                }
                Ok(())
            }
        }
    }

    /// Append a parsed block.
    ///
    /// `collect_events` runs after the block's transactions are indexed and
    /// sees the ledger including the new block; the events it returns are
    /// applied and stored on the block. Registered block listeners are
    /// notified last.
    pub fn append_block<F>(&mut self, tx_block: TxBlock, collect_events: F) -> Result<&Block, LedgerError>
    where
        F: FnOnce(&Ledger, &Block) -> Vec<StateChangeEvent>,
    {
        self.check_connects(tx_block.height, &tx_block.previous_hash)?;

        let mut seen = BTreeSet::new();
        for tx in &tx_block.txs {
            if !seen.insert(tx.id) || self.state.tx_index.contains_key(&tx.id) {
                return Err(LedgerError::DuplicateTx(tx.id));
            }
        }

        let height = tx_block.height;
        let block_pos = self.state.blocks.len();
        for (tx_pos, tx) in tx_block.txs.iter().enumerate() {
            self.index_tx(block_pos, tx_pos, tx);
        }
        self.state.blocks.push(Block::from_tx_block(tx_block));

        let mut events = Vec::new();
        if height == self.genesis.block_height {
            events.extend(self.genesis.default_param_events());
        }
        {
            let this: &Ledger = self;
            let block = &this.state.blocks[block_pos];
            events.extend(collect_events(this, block));
        }
        for event in &events {
            self.apply_event(height, event);
        }

        let block = &mut self.state.blocks[block_pos];
        block.events = events;
        let block = &self.state.blocks[block_pos];
        info!(
            height,
            hash = %block.hash,
            txs = block.txs.len(),
            events = block.events.len(),
            "block appended"
        );
        self.listeners.notify(block);
        Ok(block)
    }

    fn index_tx(&mut self, block_pos: usize, tx_pos: usize, tx: &Tx) {
        let state = &mut self.state;
        for (input_index, input) in tx.inputs.iter().enumerate() {
            let key = input.connected;
            state.unspent.remove(&key);
            if state.tx_index.contains_key(&key.tx_id) {
                state.spent_info.insert(
                    key,
                    SpentInfo {
                        block_height: tx.block_height,
                        tx_id: tx.id,
                        input_index: input_index as u32,
                    },
                );
            }
        }
        for output in tx.outputs.iter().filter(|o| o.output_type.is_bsq_output()) {
            state.unspent.insert(output.key, output.clone());
        }
        state.tx_index.insert(tx.id, (block_pos, tx_pos));
        state.total_burnt_fee = state.total_burnt_fee.saturating_add(tx.burnt_fee);
        debug!(tx_id = %tx.id, tx_type = ?tx.tx_type, burnt_fee = tx.burnt_fee, "tx indexed");
    }

    fn apply_event(&mut self, height: u64, event: &StateChangeEvent) {
        match event {
            StateChangeEvent::ParamChange {
                param,
                value,
                recorded_height,
                activation_height,
            } => {
                if *recorded_height != self.genesis.block_height {
                    info!(%param, value, activation_height, "parameter changed");
                }
                self.state.param_changes.push(ParamChange {
                    param: *param,
                    value: *value,
                    recorded_height: *recorded_height,
                    activation_height: *activation_height,
                });
            }
            StateChangeEvent::Issuance { tx_id, amount, kind } => {
                self.apply_issuance(height, *tx_id, *amount, *kind)
            }
            StateChangeEvent::BondConfiscated { lockup_tx_id } => {
                let lockup_key = TxOutputKey::new(*lockup_tx_id, 0);
                self.state.unspent.remove(&lockup_key);
                if let Some(spent) = self.state.spent_info.get(&lockup_key) {
                    let unlock_key = TxOutputKey::new(spent.tx_id, 0);
                    self.state.unspent.remove(&unlock_key);
                }
                self.state.confiscated_lockups.insert(*lockup_tx_id);
                info!(lockup_tx_id = %lockup_tx_id, "bond confiscated");
            }
            StateChangeEvent::AssetRemoved { ticker } => {
                self.state.removed_assets.insert(ticker.clone());
            }
            StateChangeEvent::BondedRoleAccepted {
                proposal_tx_id,
                role,
                required_bond,
            } => self.state.bonded_roles.push(BondedRoleRecord {
                proposal_tx_id: *proposal_tx_id,
                role: role.clone(),
                required_bond: *required_bond,
                accepted_height: height,
            }),
            StateChangeEvent::ProposalConfirmed { .. } | StateChangeEvent::BlindVoteConfirmed { .. } => {}
        }
    }

    fn apply_issuance(&mut self, height: u64, tx_id: TxId, amount: u64, kind: IssuanceKind) {
        let key = TxOutputKey::new(tx_id, 1);
        let Some(candidate) = self.get_tx_output(&key).cloned() else {
            warn!(%tx_id, "issuance without candidate output ignored");
            return;
        };
        if candidate.output_type != TxOutputType::IssuanceCandidateOutput
            || self.state.issuances.contains_key(&tx_id)
        {
            warn!(%tx_id, "issuance for non-candidate or already issued output ignored");
            return;
        }
        self.state.issuances.insert(
            tx_id,
            Issuance {
                tx_id,
                height,
                amount,
                kind,
            },
        );
        self.state.total_issued = self.state.total_issued.saturating_add(amount);
        if self.state.spent_info.contains_key(&key) {
            warn!(%tx_id, "issuance candidate already spent; issued BSQ is lost");
        } else {
            self.state.unspent.insert(key, candidate);
        }
        info!(%tx_id, amount, ?kind, "BSQ issued");
    }

    // ── Snapshots ────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Result<LedgerSnapshot, LedgerError> {
        LedgerSnapshot::create(self.state.clone())
    }

    /// Replace the state with a verified snapshot. Listeners are kept.
    pub fn restore(&mut self, snapshot: LedgerSnapshot) -> Result<(), LedgerError> {
        if !snapshot.verify()? {
            return Err(LedgerError::SnapshotCorrupt(snapshot.block_height));
        }
        info!(height = snapshot.block_height, "ledger restored from snapshot");
        self.state = snapshot.state;
        Ok(())
    }

    /// Drop all blocks, e.g. to re-derive the chain from genesis.
    pub fn reset(&mut self) {
        self.state = DaoState::default();
    }
}
