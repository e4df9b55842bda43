//! The DAO state: every parsed block plus the indexes derived from them.
//!
//! `DaoState` is plain data. All of it is serializable so that a snapshot is
//! just the bincode encoding of this struct.

use crate::block::Block;
use crate::event::IssuanceKind;
use crate::tx::{Tx, TxOutput};
use dao_types::{BlockHash, Param, TxId, TxOutputKey};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Where and by whom an output was spent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpentInfo {
    pub block_height: u64,
    pub tx_id: TxId,
    pub input_index: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamChange {
    pub param: Param,
    pub value: u64,
    pub recorded_height: u64,
    pub activation_height: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issuance {
    pub tx_id: TxId,
    pub height: u64,
    pub amount: u64,
    pub kind: IssuanceKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondedRoleRecord {
    pub proposal_tx_id: TxId,
    pub role: String,
    pub required_bond: u64,
    pub accepted_height: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoState {
    pub(crate) blocks: Vec<Block>,
    /// tx id -> (block position, tx position)
    pub(crate) tx_index: BTreeMap<TxId, (usize, usize)>,
    pub(crate) unspent: BTreeMap<TxOutputKey, TxOutput>,
    pub(crate) spent_info: BTreeMap<TxOutputKey, SpentInfo>,
    /// Ordered by recording height.
    pub(crate) param_changes: Vec<ParamChange>,
    pub(crate) issuances: BTreeMap<TxId, Issuance>,
    pub(crate) confiscated_lockups: BTreeSet<TxId>,
    pub(crate) removed_assets: BTreeSet<String>,
    pub(crate) bonded_roles: Vec<BondedRoleRecord>,
    pub(crate) total_burnt_fee: u64,
    pub(crate) total_issued: u64,
}

impl DaoState {
    pub fn chain_height(&self) -> Option<u64> {
        self.blocks.last().map(|b| b.height)
    }

    pub fn head_hash(&self) -> Option<BlockHash> {
        self.blocks.last().map(|b| b.hash)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block_at(&self, height: u64) -> Option<&Block> {
        let first = self.blocks.first()?.height;
        let pos = height.checked_sub(first)?;
        self.blocks.get(usize::try_from(pos).ok()?)
    }

    pub fn tx(&self, id: &TxId) -> Option<&Tx> {
        let (b, t) = self.tx_index.get(id)?;
        self.blocks.get(*b)?.txs.get(*t)
    }

    pub fn txs(&self) -> impl Iterator<Item = &Tx> {
        self.blocks.iter().flat_map(|b| b.txs.iter())
    }

    pub fn unspent(&self) -> &BTreeMap<TxOutputKey, TxOutput> {
        &self.unspent
    }

    pub fn spent_info(&self, key: &TxOutputKey) -> Option<&SpentInfo> {
        self.spent_info.get(key)
    }

    pub fn param_changes(&self) -> &[ParamChange] {
        &self.param_changes
    }

    /// Latest change of `param` active at `height`.
    pub fn param_change_at(&self, param: Param, height: u64) -> Option<&ParamChange> {
        self.param_changes
            .iter()
            .filter(|c| c.param == param && c.activation_height <= height)
            .max_by_key(|c| (c.activation_height, c.recorded_height))
    }

    pub fn issuance(&self, tx_id: &TxId) -> Option<&Issuance> {
        self.issuances.get(tx_id)
    }

    pub fn issuances(&self) -> impl Iterator<Item = &Issuance> {
        self.issuances.values()
    }

    pub fn is_confiscated(&self, lockup_tx_id: &TxId) -> bool {
        self.confiscated_lockups.contains(lockup_tx_id)
    }

    pub fn is_asset_removed(&self, ticker: &str) -> bool {
        self.removed_assets.contains(ticker)
    }

    pub fn bonded_roles(&self) -> &[BondedRoleRecord] {
        &self.bonded_roles
    }

    pub fn total_burnt_fee(&self) -> u64 {
        self.total_burnt_fee
    }

    pub fn total_issued(&self) -> u64 {
        self.total_issued
    }

    /// Sum of all unspent BSQ.
    pub fn unspent_total(&self) -> u64 {
        self.unspent.values().map(|o| o.value).sum()
    }
}
