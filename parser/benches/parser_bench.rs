use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use dao_ledger::{GenesisConfig, Ledger, TxBlock};
use dao_parser::{BlockParser, RawBlock, RawTx, RawTxInput, RawTxOutput};
use dao_period::PeriodEngine;
use dao_types::{BlockHash, NetworkId, Timestamp, TxId};

fn id(n: u32) -> TxId {
    let mut bytes = [0u8; 32];
    bytes[..4].copy_from_slice(&n.to_be_bytes());
    TxId::new(bytes)
}

fn transfer(tx_id: TxId, spends: TxId) -> RawTx {
    RawTx {
        id: tx_id,
        inputs: vec![RawTxInput { tx_id: spends, index: 0 }],
        outputs: vec![RawTxOutput {
            index: 0,
            value: 1_000,
            address: None,
            op_return_data: None,
        }],
    }
}

/// Ledger and period engine holding the genesis block, ready for height 1.
fn setup() -> (Ledger, PeriodEngine) {
    let mut config = GenesisConfig::for_network(NetworkId::Regtest);
    config.tx_id = id(1);
    config.block_height = 0;
    config.total_supply = 1_000;
    let mut ledger = Ledger::new(config);
    let mut period = PeriodEngine::new();
    let genesis = RawBlock {
        height: 0,
        time: Timestamp::new(0),
        hash: BlockHash::new([1; 32]),
        previous_hash: BlockHash::ZERO,
        txs: vec![transfer(id(1), TxId::ZERO)],
    };
    period.on_new_height(0, &ledger).unwrap();
    let parsed: TxBlock = BlockParser::new(&ledger, &period).parse_block(&genesis).unwrap();
    ledger.append_block(parsed, |_, _| vec![]).unwrap();
    period.on_new_height(1, &ledger).unwrap();
    (ledger, period)
}

/// A chain of `n` dependent transfers listed last-to-first, so every pass
/// resolves exactly one transaction.
fn reversed_chain_block(n: u32) -> RawBlock {
    let mut txs: Vec<RawTx> = (0..n)
        .map(|i| transfer(id(100 + i), if i == 0 { id(1) } else { id(99 + i) }))
        .collect();
    txs.reverse();
    RawBlock {
        height: 1,
        time: Timestamp::new(600),
        hash: BlockHash::new([2; 32]),
        previous_hash: BlockHash::new([1; 32]),
        txs,
    }
}

fn bench_dependency_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("same_block_resolution");
    let (ledger, period) = setup();
    for n in [10u32, 100, 500] {
        let block = reversed_chain_block(n);
        group.bench_with_input(BenchmarkId::new("reversed_chain", n), &block, |b, block| {
            let parser = BlockParser::new(&ledger, &period);
            b.iter(|| black_box(parser.parse_block(black_box(block)).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_dependency_resolution);
criterion_main!(benches);
