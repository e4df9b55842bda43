//! Genesis constants.
//!
//! The genesis transaction is not derived from chain data: its id, height and
//! the total supply it creates are configured per network at startup and are
//! process-wide constants afterwards.

use crate::event::StateChangeEvent;
use dao_types::{NetworkId, Param, TxId};
use serde::{Deserialize, Serialize};

const MAINNET_GENESIS_TX_ID: &str =
    "4b5417ec5ab6112bedf539c3b4f5a806ed539542d8b717e1c4470aa3180edce5";
const TESTNET_GENESIS_TX_ID: &str =
    "09e70ce0ab7a962a82a2ca84c9ae8a89140bf1c3fb6f7efad6162e39e4b362ae";
const REGTEST_GENESIS_TX_ID: &str =
    "30af0050040befd8af25068cc697e418e09c2d8ebd8d411d2240591b9ec203cf";

/// 2.5 million BSQ.
pub const DEFAULT_GENESIS_TOTAL_SUPPLY: u64 = 250_000_000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisConfig {
    pub network: NetworkId,
    pub tx_id: TxId,
    pub block_height: u64,
    /// Satoshis; the genesis outputs must sum to exactly this value.
    pub total_supply: u64,
}

impl GenesisConfig {
    pub fn for_network(network: NetworkId) -> Self {
        let (id, height) = match network {
            NetworkId::Mainnet => (MAINNET_GENESIS_TX_ID, 571_747),
            NetworkId::Testnet => (TESTNET_GENESIS_TX_ID, 1_446_300),
            NetworkId::Regtest => (REGTEST_GENESIS_TX_ID, 111),
        };
        Self {
            network,
            // The constants above are valid 64-char hex.
            tx_id: TxId::from_hex(id).unwrap_or(TxId::ZERO),
            block_height: height,
            total_supply: DEFAULT_GENESIS_TOTAL_SUPPLY,
        }
    }

    /// Parameter defaults recorded into the genesis block's event set.
    pub fn default_param_events(&self) -> Vec<StateChangeEvent> {
        Param::ALL
            .into_iter()
            .filter(Param::is_governable)
            .map(|param| StateChangeEvent::ParamChange {
                param,
                value: param.default_value(self.network),
                recorded_height: self.block_height,
                activation_height: self.block_height,
            })
            .collect()
    }
}
