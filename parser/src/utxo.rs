//! Unspent-output view while a block is being parsed: the ledger's unspent
//! set overlaid with outputs created and spent earlier in the same block.

use dao_ledger::{Ledger, Tx, TxOutput};
use dao_types::TxOutputKey;
use std::collections::{BTreeMap, BTreeSet};

pub(crate) struct BlockUtxo<'a> {
    ledger: &'a Ledger,
    created: BTreeMap<TxOutputKey, TxOutput>,
    spent: BTreeSet<TxOutputKey>,
}

impl<'a> BlockUtxo<'a> {
    pub(crate) fn new(ledger: &'a Ledger) -> Self {
        Self {
            ledger,
            created: BTreeMap::new(),
            spent: BTreeSet::new(),
        }
    }

    pub(crate) fn get(&self, key: &TxOutputKey) -> Option<&TxOutput> {
        if self.spent.contains(key) {
            return None;
        }
        self.created
            .get(key)
            .or_else(|| self.ledger.get_unspent_output(key))
    }

    pub(crate) fn apply(&mut self, tx: &Tx) {
        for input in &tx.inputs {
            self.created.remove(&input.connected);
            self.spent.insert(input.connected);
        }
        for output in tx.outputs.iter().filter(|o| o.output_type.is_bsq_output()) {
            self.created.insert(output.key, output.clone());
        }
    }
}
