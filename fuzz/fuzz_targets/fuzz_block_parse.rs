#![no_main]

use dao_ledger::{GenesisConfig, Ledger};
use dao_parser::{BlockParser, RawBlock};
use dao_period::PeriodEngine;
use dao_types::NetworkId;
use libfuzzer_sys::fuzz_target;

// Treat an arbitrary raw block as the genesis block, with its first tx as
// the genesis tx, and run both parser variants over it. Parsing must never
// panic and must be deterministic.
fuzz_target!(|data: &[u8]| {
    let Ok(raw) = bincode::deserialize::<RawBlock>(data) else {
        return;
    };
    let Some(first) = raw.txs.first() else {
        return;
    };
    let mut genesis = GenesisConfig::for_network(NetworkId::Regtest);
    genesis.block_height = raw.height;
    genesis.tx_id = first.id;
    let ledger = Ledger::new(genesis);
    let mut period = PeriodEngine::new();
    if period.on_new_height(raw.height, &ledger).is_err() {
        return;
    }

    let parser = BlockParser::new(&ledger, &period);
    let first_pass = parser.parse_block(&raw);
    let second_pass = parser.parse_block(&raw);
    assert_eq!(first_pass.is_ok(), second_pass.is_ok());
    if let (Ok(a), Ok(b)) = (first_pass, second_pass) {
        assert_eq!(a.txs, b.txs);
    }
});
