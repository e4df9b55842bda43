//! End-to-end runs of the node against the nullable chain daemon, peer
//! network and broadcaster: a governance cycle from proposal to issuance,
//! lite nodes following a full node, reorgs and blind-vote recovery.

use std::sync::Arc;

use dao_crypto::keypair_from_seed;
use dao_governance::{ProposalDraft, ProposalKind, Vote};
use dao_ledger::{IssuanceKind, StateChangeEvent};
use dao_network::{DaoPayload, PayloadEvent, PeerId};
use dao_node::{DaoEvent, DaoNode, GenesisOverrides, NodeConfig, NodeDriver, NodeError, NodeMode, ShutdownController};
use dao_nullables::{NullBroadcaster, NullChainDaemon, NullPeerNetwork, NullWallet, PeerBehavior, RawBlockBuilder};
use dao_parser::{ParseError, RawBlock, RawTx, RawTxInput, RawTxOutput};
use dao_types::{NetworkId, Phase, TxId, TxOutputKey, TxType};
use dao_voting::{VoteResultOutcome, VoteStatus};
use tokio::sync::broadcast;

// regtest cycle from 10: proposal 10..=13, break 14, blind vote 15..=16,
// break 17, reveal 18..=19, break 20, result 21..=22, break 23
const GENESIS: u64 = 10;

fn genesis_tx_id() -> TxId {
    TxId::new([0x6E; 32])
}

fn genesis_tx() -> RawTx {
    let output = |index, value| RawTxOutput {
        index,
        value,
        address: None,
        op_return_data: None,
    };
    RawTx {
        id: genesis_tx_id(),
        inputs: vec![RawTxInput {
            tx_id: TxId::new([0; 32]),
            index: 0,
        }],
        outputs: vec![output(0, 600_000), output(1, 400_000)],
    }
}

fn config(mode: NodeMode) -> NodeConfig {
    NodeConfig {
        network: NetworkId::Regtest,
        mode,
        genesis: GenesisOverrides {
            tx_id: Some(genesis_tx_id().to_string()),
            block_height: Some(GENESIS),
            total_supply: Some(1_000_000),
        },
        ..NodeConfig::default()
    }
}

fn drain(rx: &mut broadcast::Receiver<DaoEvent>) -> Vec<DaoEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// A full node wired to nullable collaborators. Mined blocks carry
/// whatever the node broadcast since the previous block.
struct Harness {
    daemon: Arc<NullChainDaemon>,
    peers: Arc<NullPeerNetwork>,
    broadcaster: Arc<NullBroadcaster>,
    builder: RawBlockBuilder,
    driver: NodeDriver,
}

impl Harness {
    fn new(node: DaoNode) -> Self {
        let daemon = Arc::new(NullChainDaemon::new());
        let peers = Arc::new(NullPeerNetwork::new());
        let broadcaster = Arc::new(NullBroadcaster::new());
        let driver = NodeDriver::new(node, peers.clone(), broadcaster.clone()).with_chain(daemon.clone());
        Self {
            daemon,
            peers,
            broadcaster,
            builder: RawBlockBuilder::new(GENESIS),
            driver,
        }
    }

    /// A node holding the 600k genesis output.
    fn with_wallet() -> Self {
        let wallet = NullWallet::with_coin(1, TxOutputKey::new(genesis_tx_id(), 0), 600_000);
        let node = DaoNode::new(config(NodeMode::Full))
            .unwrap()
            .with_wallet(Arc::new(wallet), keypair_from_seed(&[1; 32]));
        Self::new(node)
    }

    fn observer(config: NodeConfig) -> Self {
        Self::new(DaoNode::new(config).unwrap())
    }

    async fn mine_genesis(&mut self) -> RawBlock {
        let raw = self.builder.block(vec![genesis_tx()]);
        self.push_and_sync(raw).await
    }

    async fn mine(&mut self) -> RawBlock {
        let txs = self.broadcaster.take_raw_txs().unwrap();
        let raw = self.builder.block(txs);
        self.push_and_sync(raw).await
    }

    async fn mine_to(&mut self, height: u64) {
        while self.builder.next_height() <= height {
            self.mine().await;
        }
    }

    async fn push_and_sync(&mut self, raw: RawBlock) -> RawBlock {
        self.daemon.push_block(raw.clone());
        self.driver.sync().await.unwrap();
        assert_eq!(self.node().chain_height(), Some(raw.height));
        raw
    }

    fn node(&self) -> &DaoNode {
        self.driver.node()
    }

    fn events_at(&self, height: u64) -> Vec<StateChangeEvent> {
        self.node().ledger().get_block(height).unwrap().events.clone()
    }
}

/// Runs a node voting alone through one cycle up to the last block before
/// the vote result. Returns the compensation request and blind vote tx ids.
async fn vote_through_reveal(a: &mut Harness) -> (TxId, TxId) {
    a.mine_genesis().await;
    assert_eq!(a.node().period().current_phase(), Phase::Proposal);

    let payload = a
        .driver
        .node_mut()
        .create_proposal(ProposalDraft {
            name: "Q3 development".into(),
            description: "Backend work for the next cycle".into(),
            link: "https://forum.example/t/12".into(),
            kind: ProposalKind::CompensationRequest { requested: 50_000 },
        })
        .unwrap();
    let comp = payload.proposal.tx_id.unwrap();
    a.driver.flush_outbox().await;
    assert!(a
        .peers
        .broadcast_payloads()
        .contains(&DaoPayload::Proposal(payload.clone())));

    a.mine().await;
    assert_eq!(
        a.node().ledger().get_tx(&comp).unwrap().tx_type,
        TxType::CompensationRequest
    );

    a.mine_to(15).await;
    assert_eq!(a.node().period().current_phase(), Phase::BlindVote);
    assert!(a.peers.broadcast_payloads().iter().any(
        |p| matches!(p, DaoPayload::ConfirmedProposal(c) if c.proposal.tx_id == Some(comp))
    ));

    a.driver.node_mut().set_vote(comp, Some(Vote::ACCEPT));
    let blind_vote = a.driver.node_mut().publish_blind_vote(100_000).unwrap();
    let blind_vote_tx_id = blind_vote.blind_vote.tx_id;
    a.driver.flush_outbox().await;

    a.mine().await;
    assert!(a
        .events_at(16)
        .iter()
        .any(|e| matches!(e, StateChangeEvent::BlindVoteConfirmed { tx_id, .. } if *tx_id == blind_vote_tx_id)));

    // the reveal is built and broadcast while syncing the first reveal block
    a.mine_to(18).await;
    assert_eq!(a.broadcaster.sent().len(), 1);
    assert!(matches!(
        a.node().blind_votes().my_votes().get(&blind_vote_tx_id).unwrap().status,
        VoteStatus::Revealed { .. }
    ));

    let reveal_block = a.mine().await;
    assert_eq!(reveal_block.height, 19);
    let reveal = a.node().ledger().get_block(19).unwrap();
    assert_eq!(reveal.txs.len(), 1);
    assert_eq!(reveal.txs[0].tx_type, TxType::VoteReveal);

    a.mine_to(20).await;
    (comp, blind_vote_tx_id)
}

#[tokio::test]
async fn full_node_runs_a_cycle_from_proposal_to_issuance() {
    let mut a = Harness::with_wallet();
    let mut events = a.node().subscribe();
    let (comp, blind_vote) = vote_through_reveal(&mut a).await;

    a.mine().await;
    assert_eq!(a.node().period().current_phase(), Phase::VoteResult);
    assert_eq!(
        a.events_at(21),
        vec![StateChangeEvent::Issuance {
            tx_id: comp,
            amount: 50_000,
            kind: IssuanceKind::Compensation,
        }]
    );
    let issuance = a.node().ledger().state().issuance(&comp).unwrap();
    assert_eq!(issuance.amount, 50_000);
    assert_eq!(issuance.height, 21);
    assert_eq!(
        a.node().blind_votes().my_votes().get(&blind_vote).unwrap().status,
        VoteStatus::Tallied
    );

    let events = drain(&mut events);
    assert!(events
        .iter()
        .any(|e| matches!(e, DaoEvent::ProposalRepublished(p) if p.proposal.tx_id == Some(comp))));
    assert!(events
        .iter()
        .any(|e| matches!(e, DaoEvent::RevealPublished { blind_vote_tx_id, .. } if *blind_vote_tx_id == blind_vote)));
    assert!(events.iter().any(|e| matches!(
        e,
        DaoEvent::VoteResultCompleted(result) if result.height == 21 && result.counted_blind_votes == vec![blind_vote]
    )));
    assert_eq!(a.node().metrics().tallies_completed.get(), 1);
    assert_eq!(a.node().metrics().blocks_parsed.get(), 12);
}

#[tokio::test]
async fn lite_node_follows_a_full_node() {
    let mut a = Harness::with_wallet();
    vote_through_reveal(&mut a).await;
    a.mine().await;

    let peers = Arc::new(NullPeerNetwork::new());
    let peer = PeerId::new("full-a");
    peers.add_peer(peer.clone(), PeerBehavior::Serve);
    peers.set_blocks(&peer, a.node().ledger().blocks_from(GENESIS).to_vec());

    let lite = DaoNode::new(config(NodeMode::Lite)).unwrap();
    let mut driver = NodeDriver::new(lite, peers.clone(), Arc::new(NullBroadcaster::new()));
    assert_eq!(driver.sync().await.unwrap(), 12);

    let lite = driver.node();
    assert_eq!(lite.ledger().head_hash(), a.node().ledger().head_hash());
    assert_eq!(lite.period().current_phase(), Phase::VoteResult);
    for (ours, theirs) in lite.ledger().blocks_from(GENESIS).iter().zip(a.node().ledger().blocks_from(GENESIS)) {
        assert_eq!(ours.txs, theirs.txs);
    }

    // caught up: a second round makes no progress
    assert_eq!(driver.sync().await.unwrap(), 0);
}

#[tokio::test]
async fn lite_node_rejects_tampered_blocks_without_mutating_the_ledger() {
    let mut a = Harness::with_wallet();
    a.mine_genesis().await;
    a.driver
        .node_mut()
        .create_proposal(ProposalDraft {
            name: "Logo".into(),
            description: "Adopt the new logo".into(),
            link: "https://forum.example/t/3".into(),
            kind: ProposalKind::Generic,
        })
        .unwrap();
    a.driver.flush_outbox().await;
    a.mine().await;
    let blocks = a.node().ledger().blocks_from(GENESIS).to_vec();

    let mut lite = DaoNode::new(config(NodeMode::Lite)).unwrap();
    assert!(lite.process_lite_block(&blocks[0]).is_ok());
    let head = lite.ledger().head_hash();

    let mut detached = blocks[1].clone();
    detached.previous_hash = blocks[1].hash;
    let err = lite.process_lite_block(&detached).unwrap_err();
    assert!(matches!(err, NodeError::Parse(ParseError::BlockNotConnecting { height: 11, .. })));
    assert!(err.requires_reorg());
    assert_eq!(lite.ledger().head_hash(), head);
    assert_eq!(lite.period().chain_height(), Some(GENESIS));

    let mut forged = blocks[1].clone();
    forged.txs[0].burnt_fee += 1;
    let err = lite.process_lite_block(&forged).unwrap_err();
    assert!(matches!(err, NodeError::Parse(ParseError::LiteBlockMismatch { height: 11 })));
    assert_eq!(lite.ledger().head_hash(), head);
    assert_eq!(lite.metrics().parse_failures.get(), 2);

    assert!(lite.process_lite_block(&blocks[1]).is_ok());
    assert_eq!(lite.ledger().head_hash(), Some(blocks[1].hash));
}

#[tokio::test]
async fn reorg_rederives_from_the_last_good_snapshot() {
    let mut node_config = config(NodeMode::Full);
    node_config.snapshot_grid = 5;
    let mut h = Harness::observer(node_config);
    let mut events = h.node().subscribe();
    h.mine_genesis().await;
    h.mine_to(22).await;
    assert_eq!(h.node().snapshots().last_good().unwrap().block_height, 15);
    assert_eq!(h.node().snapshots().candidate().unwrap().block_height, 20);

    let b20 = h.daemon.blocks().into_iter().find(|b| b.height == 20).unwrap();
    let mut fork = RawBlockBuilder::after(&b20, 1);
    h.daemon.reorg_to(fork.empty());
    h.daemon.push_block(fork.empty());
    let tip = fork.empty();
    h.daemon.push_block(tip.clone());

    h.driver.sync().await.unwrap();
    assert_eq!(h.node().ledger().head_hash(), Some(tip.hash));
    assert_eq!(h.node().chain_height(), Some(23));
    assert_eq!(h.node().metrics().reorgs.get(), 1);
    assert!(drain(&mut events).iter().any(|e| matches!(
        e,
        DaoEvent::Reorg {
            failed_height: 23,
            restored_height: Some(15),
            resume_from: 16,
        }
    )));
    // the replayed grid block keeps the older snapshot as a fallback
    assert_eq!(h.node().snapshots().last_good().unwrap().block_height, 15);
}

#[tokio::test]
async fn partial_tally_is_rederived_after_blind_votes_are_recovered() {
    let mut a = Harness::with_wallet();
    let (comp, blind_vote) = vote_through_reveal(&mut a).await;
    let a_payloads = a.peers.broadcast_payloads();
    let confirmed = a_payloads
        .iter()
        .find(|p| matches!(p, DaoPayload::ConfirmedProposal(_)))
        .cloned()
        .unwrap();
    let blind_votes: Vec<DaoPayload> = a_payloads
        .iter()
        .filter(|p| matches!(p, DaoPayload::BlindVote(_)))
        .cloned()
        .collect();
    assert_eq!(blind_votes.len(), 1);

    // B follows the same chain but never saw A's blind vote
    let mut b = Harness::observer(config(NodeMode::Full));
    let peer_a = PeerId::new("a");
    b.peers.add_peer(peer_a.clone(), PeerBehavior::Serve);
    b.peers.set_payloads(&peer_a, blind_votes);
    let mut events = b.node().subscribe();
    for raw in a.daemon.blocks() {
        b.daemon.push_block(raw);
    }
    b.driver.sync().await.unwrap();
    assert_eq!(b.node().chain_height(), Some(20));
    assert!(b
        .driver
        .node_mut()
        .on_payload_event(PayloadEvent::Added(confirmed))
        .unwrap());

    let result_block = a.builder.block(Vec::new());
    b.push_and_sync(result_block).await;

    // the first pass leaves A's reveal out, the pass after recovery counts it
    let events = drain(&mut events);
    let partial = events
        .iter()
        .position(|e| matches!(e, DaoEvent::VoteResultCompleted(r) if r.counted_blind_votes.is_empty() && r.excluded_reveals == vec![blind_vote]))
        .unwrap();
    let completed = events
        .iter()
        .position(|e| matches!(e, DaoEvent::VoteResultCompleted(r) if r.counted_blind_votes == vec![blind_vote] && r.excluded_reveals.is_empty()))
        .unwrap();
    assert!(partial < completed);
    assert!(!events.iter().any(|e| matches!(e, DaoEvent::VoteResultDeferred { .. })));

    assert!(matches!(
        b.node().results().last_outcome(),
        Some(VoteResultOutcome::Completed(result)) if result.height == 21
    ));
    assert_eq!(b.node().ledger().state().issuance(&comp).unwrap().amount, 50_000);
    assert_eq!(b.node().chain_height(), Some(21));
    assert_eq!(b.peers.requests(), vec![peer_a]);
}

#[tokio::test]
async fn late_joiner_pulls_proposals_from_a_peer() {
    let mut a = Harness::with_wallet();
    a.mine_genesis().await;
    let payload = a
        .driver
        .node_mut()
        .create_proposal(ProposalDraft {
            name: "Seed node hosting".into(),
            description: "Two seed nodes for one cycle".into(),
            link: "https://forum.example/t/31".into(),
            kind: ProposalKind::CompensationRequest { requested: 20_000 },
        })
        .unwrap();
    a.driver.flush_outbox().await;
    a.mine().await;

    let mut b = Harness::observer(config(NodeMode::Full));
    let peer_a = PeerId::new("a");
    b.peers.add_peer(peer_a.clone(), PeerBehavior::Serve);
    b.peers.set_payloads(&peer_a, a.peers.broadcast_payloads());
    for raw in a.daemon.blocks() {
        b.daemon.push_block(raw);
    }
    b.driver.sync().await.unwrap();
    assert_eq!(b.node().period().current_phase(), Phase::Proposal);

    assert_eq!(b.driver.request_payloads().await, 1);
    assert_eq!(b.node().proposals().preliminary().collect::<Vec<_>>(), vec![&payload]);
    assert_eq!(b.node().metrics().proposals_received.get(), 1);

    // nothing new the second time
    assert_eq!(b.driver.request_payloads().await, 0);
    assert_eq!(b.peers.requests().len(), 6);
}

#[tokio::test]
async fn peer_withdrawal_after_the_proposal_phase_is_ignored() {
    let mut a = Harness::with_wallet();
    a.mine_genesis().await;
    let payload = a
        .driver
        .node_mut()
        .create_proposal(ProposalDraft {
            name: "Translations".into(),
            description: "Three languages for one cycle".into(),
            link: "https://forum.example/t/44".into(),
            kind: ProposalKind::CompensationRequest { requested: 20_000 },
        })
        .unwrap();
    a.driver.flush_outbox().await;
    a.mine().await;
    a.mine_to(14).await;
    assert_eq!(a.node().period().current_phase(), Phase::Break1);

    let removed = a
        .driver
        .node_mut()
        .on_payload_event(PayloadEvent::Removed(DaoPayload::Proposal(payload.clone())))
        .unwrap();
    assert!(!removed);
    assert_eq!(a.node().proposals().preliminary().collect::<Vec<_>>(), vec![&payload]);
}

#[tokio::test]
async fn run_loop_follows_notified_blocks_until_shutdown() {
    let mut h = Harness::observer(config(NodeMode::Full));
    h.mine_genesis().await;
    let mut events = h.node().subscribe();
    let controller = ShutdownController::new();
    let next = h.builder.empty();
    let daemon = Arc::clone(&h.daemon);

    let feed = async {
        daemon.push_block(next.clone());
        loop {
            match events.recv().await {
                Ok(DaoEvent::BlockParsed { height: 11, .. }) => break,
                Ok(_) => {}
                Err(err) => panic!("event feed failed: {err}"),
            }
        }
        controller.shutdown();
    };
    let (run, ()) = tokio::join!(h.driver.run(controller.subscribe()), feed);
    run.unwrap();

    assert_eq!(h.driver.node().ledger().head_hash(), Some(next.hash));
}
