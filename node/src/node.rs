//! The DAO node: owner of every piece of parser-context state.
//!
//! Blocks are processed strictly one after another. For each block the
//! period engine is advanced first, then the block is parsed (raw for a
//! full node, re-derived for a lite node) and appended with the events of
//! the proposal, blind-vote and vote-result services. Wallet actions and
//! network payloads produced along the way are queued in an [`Outbox`] for
//! the driver to send; nothing here performs I/O.

use std::sync::Arc;

use dao_governance::{
    BallotList, BallotListService, ContentHash, GovernanceError, ProposalDraft, ProposalFactory,
    ProposalPayload, ProposalService, SignedTx, Vote, WalletService,
};
use dao_ledger::{Block, Ledger, LedgerError, LedgerSnapshot, TxBlock};
use dao_network::{DaoPayload, PayloadEvent};
use dao_parser::{BlockParser, ParseError, RawBlock};
use dao_period::{collect_events, DaoView, PeriodEngine, PeriodSnapshot, PhaseChange, StateChangeProvider};
use dao_types::{BlockHash, Digest, KeyPair, TxId};
use dao_voting::{
    BlindVotePayload, BlindVoteService, RecoveryRequest, VoteResultOutcome, VoteResultService,
    VoteRevealService, VoteStatus,
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::{NodeConfig, NodeMode};
use crate::events::{DaoEvent, EventBus};
use crate::metrics::NodeMetrics;
use crate::snapshot::SnapshotManager;
use crate::NodeError;

pub type SharedWallet = Arc<dyn WalletService + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockOutcome {
    Appended(u64),
    /// The same block is already in the ledger.
    AlreadyKnown(u64),
}

/// Transactions and payloads waiting to be sent by the driver.
#[derive(Debug, Default)]
pub struct Outbox {
    pub txs: Vec<SignedTx>,
    pub payloads: Vec<DaoPayload>,
    /// Hash-map store entries to withdraw.
    pub removals: Vec<DaoPayload>,
    pub recovery: Vec<RecoveryRequest>,
}

impl Outbox {
    pub fn is_empty(&self) -> bool {
        self.txs.is_empty() && self.payloads.is_empty() && self.removals.is_empty() && self.recovery.is_empty()
    }
}

struct Identity {
    wallet: SharedWallet,
    keys: KeyPair,
}

pub struct DaoNode {
    config: NodeConfig,
    ledger: Ledger,
    period: PeriodEngine,
    proposals: ProposalService,
    ballots: BallotListService,
    blind_votes: BlindVoteService,
    reveals: VoteRevealService,
    results: VoteResultService,
    snapshots: SnapshotManager,
    events: EventBus,
    metrics: NodeMetrics,
    outbox: Outbox,
    identity: Option<Identity>,
    /// First height expected after the last re-derivation, until a block
    /// at or above it is appended.
    resumed_from: Option<u64>,
}

impl DaoNode {
    pub fn new(config: NodeConfig) -> Result<Self, NodeError> {
        config.validate()?;
        let ledger = Ledger::new(config.genesis_config()?);
        let snapshots = if config.persist_snapshots {
            SnapshotManager::with_path(config.snapshot_grid, config.snapshot_path())
        } else {
            SnapshotManager::new(config.snapshot_grid)
        };
        let mut node = Self {
            ledger,
            period: PeriodEngine::new(),
            proposals: ProposalService::new(),
            ballots: BallotListService::new(),
            blind_votes: BlindVoteService::new(),
            reveals: VoteRevealService::new(),
            results: VoteResultService::new(),
            snapshots,
            events: EventBus::new(),
            metrics: NodeMetrics::new()?,
            outbox: Outbox::default(),
            identity: None,
            resumed_from: None,
            config,
        };
        if node.config.persist_snapshots {
            if let Some(snapshot) = SnapshotManager::load_persisted(&node.config.snapshot_path())? {
                node.restore_to(Some(snapshot.clone()))?;
                node.snapshots.set_last_good(snapshot);
                node.resumed_from = None;
            }
        }
        info!(
            network = node.config.network.as_str(),
            mode = ?node.config.mode,
            genesis_height = node.ledger.genesis().block_height,
            next_height = node.ledger.next_height(),
            "DAO node created"
        );
        Ok(node)
    }

    /// Give the node a wallet and signing keys so it can create proposals,
    /// blind votes and reveals.
    pub fn with_wallet(mut self, wallet: SharedWallet, keys: KeyPair) -> Self {
        self.identity = Some(Identity { wallet, keys });
        self
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn mode(&self) -> NodeMode {
        self.config.mode
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn period(&self) -> &PeriodEngine {
        &self.period
    }

    pub fn period_snapshot(&self) -> PeriodSnapshot {
        self.period.snapshot()
    }

    pub fn proposals(&self) -> &ProposalService {
        &self.proposals
    }

    pub fn blind_votes(&self) -> &BlindVoteService {
        &self.blind_votes
    }

    pub fn reveals(&self) -> &VoteRevealService {
        &self.reveals
    }

    pub fn results(&self) -> &VoteResultService {
        &self.results
    }

    pub fn snapshots(&self) -> &SnapshotManager {
        &self.snapshots
    }

    pub fn metrics(&self) -> &NodeMetrics {
        &self.metrics
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DaoEvent> {
        self.events.subscribe()
    }

    pub fn next_height(&self) -> u64 {
        self.ledger.next_height()
    }

    pub fn chain_height(&self) -> Option<u64> {
        self.ledger.chain_height()
    }

    pub fn view(&self) -> DaoView<'_> {
        DaoView::new(&self.ledger, &self.period)
    }

    pub fn take_outbox(&mut self) -> Outbox {
        std::mem::take(&mut self.outbox)
    }

    // ── Block processing ─────────────────────────────────────────────────

    /// Parse and append a block from the chain daemon.
    pub fn process_raw_block(&mut self, raw: &RawBlock) -> Result<BlockOutcome, NodeError> {
        self.require_mode(NodeMode::Full)?;
        self.process(raw.height, raw.hash, raw.previous_hash, |parser| parser.parse_block(raw))
    }

    /// Re-derive and append a block received from a peer.
    pub fn process_lite_block(&mut self, block: &Block) -> Result<BlockOutcome, NodeError> {
        self.require_mode(NodeMode::Lite)?;
        self.process(block.height, block.hash, block.previous_hash, |parser| {
            parser.parse_lite_block(block)
        })
    }

    fn require_mode(&self, mode: NodeMode) -> Result<(), NodeError> {
        if self.config.mode != mode {
            return Err(NodeError::WrongMode(match mode {
                NodeMode::Full => "full",
                NodeMode::Lite => "lite",
            }));
        }
        Ok(())
    }

    fn process<F>(
        &mut self,
        height: u64,
        hash: BlockHash,
        previous_hash: BlockHash,
        parse: F,
    ) -> Result<BlockOutcome, NodeError>
    where
        F: FnOnce(&BlockParser<'_>) -> Result<TxBlock, ParseError>,
    {
        match self.check_incoming(height, &hash, &previous_hash) {
            Ok(Some(known)) => return Ok(known),
            Ok(None) => {}
            Err(err) => return Err(self.fail(height, err)),
        }
        let phase_change = match self.period.on_new_height(height, &self.ledger) {
            Ok(change) => change,
            Err(err) => return Err(self.fail(height, err.into())),
        };
        let tx_block = match parse(&BlockParser::new(&self.ledger, &self.period)) {
            Ok(tx_block) => tx_block,
            Err(err) => {
                self.rewind_period(height);
                return Err(self.fail(height, err.into()));
            }
        };
        let block = match self.append(tx_block) {
            Ok(block) => block,
            Err(err) => {
                self.rewind_period(height);
                return Err(self.fail(height, err.into()));
            }
        };
        self.after_append(&block, phase_change);
        Ok(BlockOutcome::Appended(height))
    }

    /// `Some` for a block already in the ledger; an error for one that
    /// competes with a stored block or does not connect to the head.
    fn check_incoming(
        &self,
        height: u64,
        hash: &BlockHash,
        previous_hash: &BlockHash,
    ) -> Result<Option<BlockOutcome>, NodeError> {
        match self.ledger.check_connects(height, previous_hash) {
            Ok(()) => Ok(None),
            Err(LedgerError::UnexpectedHeight { height, expected }) if height < expected => {
                match (self.ledger.get_block(height), self.ledger.head_hash()) {
                    (Some(known), _) if known.hash == *hash => Ok(Some(BlockOutcome::AlreadyKnown(height))),
                    (Some(_), Some(head)) => Err(ParseError::BlockNotConnecting {
                        height,
                        previous: *previous_hash,
                        head,
                    }
                    .into()),
                    _ => Err(ParseError::from(LedgerError::UnexpectedHeight { height, expected }).into()),
                }
            }
            Err(err) => Err(ParseError::from(err).into()),
        }
    }

    fn append(&mut self, tx_block: TxBlock) -> Result<Block, LedgerError> {
        let Self {
            ledger,
            period,
            proposals,
            blind_votes,
            results,
            ..
        } = self;
        ledger
            .append_block(tx_block, |ledger, block| {
                let view = DaoView::new(ledger, period);
                let mut providers: [&mut dyn StateChangeProvider; 2] = [&mut *proposals, &mut *blind_votes];
                let mut events = collect_events(&mut providers, &view, block);
                events.extend(results.on_block(&view, block, &*proposals, &mut *blind_votes));
                events
            })
            .map(Block::clone)
    }

    /// Undo the period advance for a block that was not appended.
    fn rewind_period(&mut self, height: u64) {
        if height > self.ledger.genesis().block_height {
            self.period.truncate(height - 1);
        } else {
            self.period = PeriodEngine::new();
        }
    }

    fn fail(&self, height: u64, err: NodeError) -> NodeError {
        self.metrics.parse_failures.inc();
        warn!(height, %err, reorg = err.requires_reorg(), "block rejected");
        self.events.emit(DaoEvent::ParseFailed {
            height,
            reason: err.to_string(),
        });
        err
    }

    fn after_append(&mut self, block: &Block, phase_change: Option<PhaseChange>) {
        let height = block.height;
        if self.resumed_from.is_some_and(|resume| height >= resume) {
            self.resumed_from = None;
        }
        self.metrics.blocks_parsed.inc();
        self.metrics.chain_height.set(height as i64);
        if let Some(index) = self.period.cycle_index_for_height(height) {
            self.metrics.cycle_index.set(index as i64);
        }
        self.events.emit(DaoEvent::BlockParsed {
            height,
            hash: block.hash,
            txs: block.txs.len(),
            events: block.events.len(),
        });
        if let Some(change) = phase_change {
            self.events.emit(DaoEvent::PhaseChanged {
                height: change.height,
                previous: change.previous,
                current: change.current,
                period: self.period.snapshot(),
            });
        }

        if let Err(err) = self.snapshots.on_block(&self.ledger, height) {
            warn!(height, %err, "snapshot failed");
        }

        for payload in self.proposals.take_republished() {
            self.outbox.payloads.push(DaoPayload::ConfirmedProposal(payload.clone()));
            self.events.emit(DaoEvent::ProposalRepublished(payload));
        }

        self.report_vote_result(height);
        self.reveal_votes();
        self.outbox.payloads.extend(
            self.blind_votes
                .take_published()
                .into_iter()
                .map(DaoPayload::BlindVote),
        );
    }

    fn report_vote_result(&mut self, height: u64) {
        match self.results.last_outcome() {
            Some(VoteResultOutcome::Completed(result)) if result.height == height => {
                self.metrics.tallies_completed.inc();
                self.events.emit(DaoEvent::VoteResultCompleted(result.clone()));
            }
            Some(VoteResultOutcome::Deferred { request, error }) if request.height == height => {
                self.metrics.tallies_deferred.inc();
                self.events.emit(DaoEvent::VoteResultDeferred {
                    request: request.clone(),
                    error: error.clone(),
                });
            }
            _ => {}
        }
        self.outbox.recovery.extend(self.results.take_recovery_requests());
    }

    fn reveal_votes(&mut self) {
        let Some(identity) = &self.identity else {
            return;
        };
        let view = DaoView::new(&self.ledger, &self.period);
        let txs = self
            .reveals
            .on_new_block(&view, &mut self.blind_votes, identity.wallet.as_ref());
        for tx in txs {
            let blind_vote_tx_id = self
                .blind_votes
                .my_votes()
                .iter()
                .find(|v| v.status == VoteStatus::Revealed { reveal_tx_id: tx.tx_id })
                .map(|v| v.blind_vote_tx_id);
            if let Some(blind_vote_tx_id) = blind_vote_tx_id {
                self.events.emit(DaoEvent::RevealPublished {
                    blind_vote_tx_id,
                    reveal_tx_id: tx.tx_id,
                });
            }
            self.metrics.reveals_published.inc();
            self.outbox.txs.push(tx);
        }
        for err in self.reveals.take_errors() {
            self.metrics.reveal_failures.inc();
            self.events.emit(DaoEvent::RevealFailed(err));
        }
    }

    // ── Re-derivation ────────────────────────────────────────────────────

    /// Rewind after a chain-integrity failure at `failed_height`. Returns
    /// the height blocks are expected from again.
    ///
    /// A failure right after a previous rewind goes one snapshot deeper, and
    /// to genesis once no snapshot is left.
    pub fn reorg(&mut self, failed_height: u64) -> Result<u64, NodeError> {
        let limit = match self.resumed_from {
            Some(resume) if failed_height <= resume => resume.saturating_sub(1),
            _ => failed_height,
        };
        let snapshot = self.snapshots.reorg_point(limit).cloned();
        let (restored_height, resume_from) = self.restore_to(snapshot)?;
        self.metrics.reorgs.inc();
        warn!(failed_height, ?restored_height, resume_from, "chain re-derived from snapshot");
        self.events.emit(DaoEvent::Reorg {
            failed_height,
            restored_height,
            resume_from,
        });
        Ok(resume_from)
    }

    /// Add payloads recovered from peers. When the latest tally was deferred
    /// or left out reveals it lacked, and something new arrived, the chain
    /// from the newest snapshot before the tally is re-derived locally;
    /// returns the height re-derivation started at.
    pub fn on_recovered_payloads(&mut self, payloads: Vec<DaoPayload>) -> Result<Option<u64>, NodeError> {
        let mut added = 0usize;
        for payload in payloads {
            match self.on_payload_event(PayloadEvent::Added(payload)) {
                Ok(true) => added += 1,
                Ok(false) => {}
                Err(err) => debug!(%err, "recovered payload rejected"),
            }
        }
        let incomplete_at = match self.results.last_outcome() {
            Some(VoteResultOutcome::Deferred { request, .. }) => Some(request.height),
            Some(VoteResultOutcome::Completed(result)) if !result.excluded_reveals.is_empty() => Some(result.height),
            _ => None,
        };
        info!(added, ?incomplete_at, "recovered payloads applied");
        match incomplete_at {
            Some(height) if added > 0 => self.rederive_before(height).map(Some),
            _ => Ok(None),
        }
    }

    /// Restore the newest snapshot below `height` and replay the stored
    /// blocks above it.
    pub fn rederive_before(&mut self, height: u64) -> Result<u64, NodeError> {
        let snapshot = self.snapshots.latest_below(height).cloned();
        let from = snapshot
            .as_ref()
            .map_or(self.ledger.genesis().block_height, |s| s.block_height + 1);
        let blocks: Vec<Block> = self.ledger.blocks_from(from).to_vec();
        self.restore_to(snapshot)?;
        info!(from, blocks = blocks.len(), "replaying stored blocks");
        for block in &blocks {
            match self.config.mode {
                NodeMode::Full => self.process_raw_block(&RawBlock::from(block))?,
                NodeMode::Lite => self.process_lite_block(block)?,
            };
        }
        Ok(from)
    }

    /// Rewind every component to `snapshot`, or to before genesis. Returns
    /// the restored height and the next expected height.
    fn restore_to(&mut self, snapshot: Option<LedgerSnapshot>) -> Result<(Option<u64>, u64), NodeError> {
        let restored = match snapshot {
            Some(snapshot) => {
                let height = snapshot.block_height;
                self.ledger.restore(snapshot)?;
                self.snapshots.truncate(height);
                self.results.truncate(height + 1);
                Some(height)
            }
            None => {
                self.ledger.reset();
                self.snapshots.clear();
                self.results.truncate(0);
                None
            }
        };
        self.period = PeriodEngine::rebuild(&self.ledger)?;
        let resume_from = self.ledger.next_height();
        self.resumed_from = Some(resume_from);
        self.metrics.chain_height.set(restored.map_or(0, |h| h as i64));
        Ok((restored, resume_from))
    }

    // ── Network payloads ─────────────────────────────────────────────────

    /// Apply a store change from the peer network. Returns whether the
    /// node's state changed.
    pub fn on_payload_event(&mut self, event: PayloadEvent) -> Result<bool, NodeError> {
        let view = DaoView::new(&self.ledger, &self.period);
        match event {
            PayloadEvent::Added(DaoPayload::Proposal(payload)) => {
                let is_new = self.proposals.on_proposal_received(payload, &view)?;
                if is_new {
                    self.metrics.proposals_received.inc();
                }
                Ok(is_new)
            }
            PayloadEvent::Added(DaoPayload::ConfirmedProposal(payload)) => {
                Ok(self.proposals.on_confirmed_proposal_received(payload, &view)?)
            }
            PayloadEvent::Added(DaoPayload::BlindVote(payload)) => {
                let is_new = self.blind_votes.on_blind_vote_received(payload)?;
                if is_new {
                    self.metrics.blind_votes_received.inc();
                }
                Ok(is_new)
            }
            PayloadEvent::Removed(DaoPayload::Proposal(payload)) => {
                let hash = payload.content_hash()?;
                match self.proposals.remove_proposal(&hash, &view) {
                    Ok(_) => Ok(true),
                    Err(GovernanceError::ProposalNotFound(_)) => Ok(false),
                    // a peer's late withdrawal; the proposal stays
                    Err(GovernanceError::InvariantViolation(reason)) => {
                        warn!(%reason, "peer removal ignored");
                        Ok(false)
                    }
                    Err(err) => Err(err.into()),
                }
            }
            PayloadEvent::Removed(other) => {
                debug!(kind = ?other.kind(), "removal from an append-only store ignored");
                Ok(false)
            }
        }
    }

    // ── Wallet actions ───────────────────────────────────────────────────

    /// Create a proposal and queue its fee tx and payload.
    pub fn create_proposal(&mut self, draft: ProposalDraft) -> Result<ProposalPayload, NodeError> {
        let identity = self.identity.as_ref().ok_or(NodeError::NoWallet)?;
        let view = DaoView::new(&self.ledger, &self.period);
        let (payload, tx) =
            ProposalFactory::new(identity.wallet.as_ref()).create(&identity.keys, draft, &view)?;
        self.proposals.on_proposal_received(payload.clone(), &view)?;
        self.outbox.txs.push(tx);
        self.outbox.payloads.push(DaoPayload::Proposal(payload.clone()));
        Ok(payload)
    }

    /// Withdraw one of the preliminary proposals.
    pub fn remove_proposal(&mut self, hash: &Digest) -> Result<ProposalPayload, NodeError> {
        let view = DaoView::new(&self.ledger, &self.period);
        let removed = self.proposals.remove_proposal(hash, &view)?;
        self.outbox.removals.push(DaoPayload::Proposal(removed.clone()));
        Ok(removed)
    }

    pub fn set_vote(&mut self, proposal_tx_id: TxId, vote: Option<Vote>) {
        self.ballots.set_vote(proposal_tx_id, vote);
    }

    /// Ballots on the current cycle's confirmed proposals.
    pub fn ballot_list(&self) -> BallotList {
        let view = self.view();
        self.ballots
            .ballot_list(self.proposals.confirmed_for_cycle(&view, view.height()))
    }

    /// Lock `stake` behind the current ballot list and queue the tx and
    /// payload.
    pub fn publish_blind_vote(&mut self, stake: u64) -> Result<BlindVotePayload, NodeError> {
        let identity = self.identity.as_ref().ok_or(NodeError::NoWallet)?;
        let view = DaoView::new(&self.ledger, &self.period);
        let ballots = self
            .ballots
            .ballot_list(self.proposals.confirmed_for_cycle(&view, view.height()));
        let (payload, tx) = self.blind_votes.publish_blind_vote(
            identity.wallet.as_ref(),
            &identity.keys,
            ballots,
            stake,
            &view,
        )?;
        self.events.emit(DaoEvent::BlindVotePublished {
            tx_id: tx.tx_id,
            stake,
        });
        self.outbox.txs.push(tx);
        self.outbox.payloads.extend(
            self.blind_votes
                .take_published()
                .into_iter()
                .map(DaoPayload::BlindVote),
        );
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dao_types::{NetworkId, Phase};

    fn config(mode: NodeMode) -> NodeConfig {
        NodeConfig {
            network: NetworkId::Regtest,
            mode,
            ..NodeConfig::default()
        }
    }

    #[test]
    fn wrong_mode_is_refused() {
        let mut node = DaoNode::new(config(NodeMode::Lite)).unwrap();
        let raw = RawBlock {
            height: node.next_height(),
            time: dao_types::Timestamp::new(0),
            hash: BlockHash::new([1; 32]),
            previous_hash: BlockHash::ZERO,
            txs: vec![],
        };
        assert!(matches!(node.process_raw_block(&raw), Err(NodeError::WrongMode("full"))));
        assert!(node.ledger().is_empty());
    }

    #[test]
    fn wallet_actions_need_a_wallet() {
        let mut node = DaoNode::new(config(NodeMode::Full)).unwrap();
        assert!(matches!(node.publish_blind_vote(1_000), Err(NodeError::NoWallet)));
        assert_eq!(node.period().current_phase(), Phase::Undefined);
        assert!(node.take_outbox().is_empty());
    }

    #[test]
    fn genesis_block_missing_genesis_tx_is_rejected_and_rewound() {
        let mut node = DaoNode::new(config(NodeMode::Full)).unwrap();
        let mut events = node.subscribe();
        let raw = RawBlock {
            height: node.next_height(),
            time: dao_types::Timestamp::new(0),
            hash: BlockHash::new([1; 32]),
            previous_hash: BlockHash::ZERO,
            txs: vec![],
        };
        let err = node.process_raw_block(&raw).unwrap_err();
        assert!(matches!(err, NodeError::Parse(ParseError::GenesisTxNotFound { .. })));
        assert!(!err.requires_reorg());
        assert!(node.ledger().is_empty());
        assert_eq!(node.period().chain_height(), None);
        assert_eq!(node.metrics().parse_failures.get(), 1);
        assert!(matches!(events.try_recv().unwrap(), DaoEvent::ParseFailed { .. }));
    }
}
