//! Read-only view handed to state-change providers while a block is being
//! appended.

use crate::engine::PeriodEngine;
use dao_ledger::{Block, Ledger, StateChangeEvent};
use dao_types::{Param, Phase};

#[derive(Clone, Copy)]
pub struct DaoView<'a> {
    pub ledger: &'a Ledger,
    pub period: &'a PeriodEngine,
}

impl<'a> DaoView<'a> {
    pub fn new(ledger: &'a Ledger, period: &'a PeriodEngine) -> Self {
        Self { ledger, period }
    }

    /// Height the period engine was last advanced to.
    pub fn height(&self) -> u64 {
        self.period
            .chain_height()
            .or_else(|| self.ledger.chain_height())
            .unwrap_or(self.ledger.genesis().block_height)
    }

    pub fn phase(&self) -> Phase {
        self.period.current_phase()
    }

    /// Parameter value at the current height.
    pub fn param(&self, param: Param) -> u64 {
        self.ledger.param_value(param, self.height())
    }
}

/// A component contributing [`StateChangeEvent`]s to a block at append time.
pub trait StateChangeProvider {
    fn on_block(&mut self, view: &DaoView<'_>, block: &Block) -> Vec<StateChangeEvent>;
}

/// Ask each provider in order; the concatenation becomes the block's event
/// set.
pub fn collect_events(
    providers: &mut [&mut dyn StateChangeProvider],
    view: &DaoView<'_>,
    block: &Block,
) -> Vec<StateChangeEvent> {
    providers
        .iter_mut()
        .flat_map(|p| p.on_block(view, block))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dao_ledger::{GenesisConfig, TxBlock};
    use dao_types::{BlockHash, NetworkId, Timestamp, TxId};

    struct Fixed(u64);

    impl StateChangeProvider for Fixed {
        fn on_block(&mut self, view: &DaoView<'_>, _block: &Block) -> Vec<StateChangeEvent> {
            vec![StateChangeEvent::ParamChange {
                param: Param::ProposalFee,
                value: self.0,
                recorded_height: view.height(),
                activation_height: view.height() + 1,
            }]
        }
    }

    #[test]
    fn providers_contribute_in_order() {
        let mut config = GenesisConfig::for_network(NetworkId::Regtest);
        config.tx_id = TxId::new([1; 32]);
        let genesis = config.block_height;
        let mut ledger = Ledger::new(config);
        let mut period = PeriodEngine::new();
        period.on_new_height(genesis, &ledger).unwrap();

        let block = TxBlock {
            height: genesis,
            time: Timestamp::new(0),
            hash: BlockHash::new([3; 32]),
            previous_hash: BlockHash::ZERO,
            txs: vec![],
        };
        let (mut a, mut b) = (Fixed(300), Fixed(400));
        let appended = ledger
            .append_block(block, |l, blk| {
                let view = DaoView::new(l, &period);
                collect_events(&mut [&mut a, &mut b], &view, blk)
            })
            .unwrap();
        let values: Vec<u64> = appended
            .events
            .iter()
            .filter_map(|e| match e {
                StateChangeEvent::ParamChange { param: Param::ProposalFee, value, recorded_height, .. }
                    if *recorded_height == genesis && *value != 200 =>
                {
                    Some(*value)
                }
                _ => None,
            })
            .collect();
        assert_eq!(values, vec![300, 400]);
        assert_eq!(ledger.param_value(Param::ProposalFee, genesis + 1), 400);
    }
}
