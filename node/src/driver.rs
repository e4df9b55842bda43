//! Async driver around a [`DaoNode`].
//!
//! Pulls blocks from the chain daemon (full) or from peers (lite), hands
//! payload events to the node, and sends whatever the node queued. The
//! node itself stays synchronous; every await happens here, between
//! blocks.

use std::sync::Arc;
use std::time::Duration;

use dao_network::{
    fetch_blocks, fetch_payloads, with_peer_rotation, ChainDaemon, DaoPayload, NetworkError,
    PayloadEvent, PayloadKind, PeerNetwork, RequestPolicy, TxBroadcaster,
};
use dao_parser::RawBlock;
use dao_voting::RecoveryRequest;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::config::NodeMode;
use crate::events::DaoEvent;
use crate::node::{BlockOutcome, DaoNode};
use crate::NodeError;

/// Re-derivations allowed within one sync before giving up.
const MAX_REORGS_PER_SYNC: u32 = 8;
/// Outbox rounds per flush; a recovery can queue new items.
const MAX_FLUSH_ROUNDS: usize = 4;
const DEFAULT_LITE_POLL_INTERVAL: Duration = Duration::from_secs(30);
/// Proposals go first so confirmed copies and blind votes find them.
const PAYLOAD_KINDS: [PayloadKind; 3] = [PayloadKind::Proposal, PayloadKind::ConfirmedProposal, PayloadKind::BlindVote];

pub struct NodeDriver {
    node: DaoNode,
    chain: Option<Arc<dyn ChainDaemon>>,
    peers: Arc<dyn PeerNetwork>,
    broadcaster: Arc<dyn TxBroadcaster>,
    policy: RequestPolicy,
    lite_poll_interval: Duration,
}

impl NodeDriver {
    pub fn new(node: DaoNode, peers: Arc<dyn PeerNetwork>, broadcaster: Arc<dyn TxBroadcaster>) -> Self {
        let policy = node.config().request_policy();
        Self {
            node,
            chain: None,
            peers,
            broadcaster,
            policy,
            lite_poll_interval: DEFAULT_LITE_POLL_INTERVAL,
        }
    }

    pub fn with_chain(mut self, chain: Arc<dyn ChainDaemon>) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn with_policy(mut self, policy: RequestPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_lite_poll_interval(mut self, interval: Duration) -> Self {
        self.lite_poll_interval = interval;
        self
    }

    pub fn node(&self) -> &DaoNode {
        &self.node
    }

    pub fn node_mut(&mut self) -> &mut DaoNode {
        &mut self.node
    }

    pub fn into_node(self) -> DaoNode {
        self.node
    }

    fn chain(&self) -> Result<Arc<dyn ChainDaemon>, NodeError> {
        self.chain
            .clone()
            .ok_or_else(|| NodeError::Config("full node needs a chain daemon".into()))
    }

    // ── Sync ─────────────────────────────────────────────────────────────

    /// Catch up with the chain, then send the outbox. Returns the number of
    /// blocks appended.
    pub async fn sync(&mut self) -> Result<u64, NodeError> {
        let appended = match self.node.mode() {
            NodeMode::Full => self.sync_full().await?,
            NodeMode::Lite => self.sync_lite().await?,
        };
        if appended > 0 {
            info!(appended, head = ?self.node.chain_height(), "synced");
        }
        self.flush_outbox().await;
        Ok(appended)
    }

    async fn sync_full(&mut self) -> Result<u64, NodeError> {
        let chain = self.chain()?;
        let mut appended = 0;
        let mut reorgs = 0;
        loop {
            let tip = chain.chain_height().await?;
            if self.node.next_height() > tip {
                return Ok(appended);
            }
            while self.node.next_height() <= tip {
                let raw = chain.block_at(self.node.next_height()).await?;
                let result = self.node.process_raw_block(&raw);
                if self.handle(result, &mut reorgs)? {
                    appended += 1;
                }
            }
        }
    }

    async fn sync_lite(&mut self) -> Result<u64, NodeError> {
        let mut appended = 0;
        let mut reorgs = 0;
        loop {
            let from = self.node.next_height();
            let (peer, blocks) = fetch_blocks(self.peers.as_ref(), from, &self.policy).await?;
            debug!(%peer, from, received = blocks.len(), "blocks received");
            let mut progressed = false;
            for block in blocks.iter().filter(|b| b.height >= from) {
                let result = self.node.process_lite_block(block);
                let reorged = result.as_ref().is_err_and(NodeError::requires_reorg);
                if self.handle(result, &mut reorgs)? {
                    appended += 1;
                    progressed = true;
                }
                if reorged {
                    progressed = true;
                    break;
                }
            }
            if !progressed {
                return Ok(appended);
            }
        }
    }

    /// Route a block result: chain-integrity failures rewind the node.
    /// Returns whether a block was appended.
    fn handle(&mut self, result: Result<BlockOutcome, NodeError>, reorgs: &mut u32) -> Result<bool, NodeError> {
        match result {
            Ok(BlockOutcome::Appended(_)) => Ok(true),
            Ok(BlockOutcome::AlreadyKnown(_)) => Ok(false),
            Err(err) if err.requires_reorg() => {
                if *reorgs >= MAX_REORGS_PER_SYNC {
                    return Err(NodeError::TooManyReorgs(*reorgs));
                }
                *reorgs += 1;
                let failed_height = err.failed_height().unwrap_or_else(|| self.node.next_height());
                self.node.reorg(failed_height)?;
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    // ── Payloads ─────────────────────────────────────────────────────────

    /// Feed every payload the peer network currently knows to the node.
    pub fn bootstrap_payloads(&mut self) -> usize {
        let mut added = 0;
        for kind in PAYLOAD_KINDS {
            added += self.apply_payloads(self.peers.known_payloads(kind));
        }
        debug!(added, "known payloads applied");
        added
    }

    /// Ask a peer for its stores, one payload kind at a time. Returns the
    /// number of payloads that were new to the node.
    pub async fn request_payloads(&mut self) -> usize {
        let mut added = 0;
        for kind in PAYLOAD_KINDS {
            match fetch_payloads(self.peers.as_ref(), kind, &self.policy).await {
                Ok((peer, payloads)) => {
                    debug!(%peer, ?kind, received = payloads.len(), "payloads received");
                    added += self.apply_payloads(payloads);
                }
                Err(err) => debug!(?kind, %err, "payload request failed"),
            }
        }
        if added > 0 {
            info!(added, "payloads pulled from peers");
        }
        added
    }

    fn apply_payloads(&mut self, payloads: Vec<DaoPayload>) -> usize {
        let mut added = 0;
        for payload in payloads {
            let kind = payload.kind();
            match self.node.on_payload_event(PayloadEvent::Added(payload)) {
                Ok(true) => added += 1,
                Ok(false) => {}
                Err(err) => debug!(?kind, %err, "payload rejected"),
            }
        }
        added
    }

    /// Ask peers for the blind votes a deferred or partial tally lacks,
    /// moving on to the next peer when one cannot supply all of them.
    pub async fn recover(&mut self, request: &RecoveryRequest) -> Result<Option<u64>, NodeError> {
        let peers = Arc::clone(&self.peers);
        let missing = request.missing_blind_votes.clone();
        let (peer, payloads) = with_peer_rotation(self.peers.peers(), &self.policy, |peer| {
            let peers = Arc::clone(&peers);
            let missing = missing.clone();
            async move {
                let payloads = peers.request_payloads(&peer, PayloadKind::BlindVote).await?;
                let covered = missing.iter().all(|id| {
                    payloads
                        .iter()
                        .any(|p| matches!(p, DaoPayload::BlindVote(b) if b.blind_vote.tx_id == *id))
                });
                if covered {
                    Ok(payloads)
                } else {
                    Err(NetworkError::Peer {
                        peer,
                        message: "missing requested blind votes".into(),
                    })
                }
            }
        })
        .await?;
        info!(
            %peer,
            cycle_index = request.cycle_index,
            missing = request.missing_blind_votes.len(),
            received = payloads.len(),
            "blind votes recovered"
        );
        self.node.on_recovered_payloads(payloads)
    }

    // ── Outbox ───────────────────────────────────────────────────────────

    /// Send queued txs and payloads. Tx broadcasts are attempted once; a
    /// failure is reported as an event and left to the user.
    pub async fn flush_outbox(&mut self) {
        for _ in 0..MAX_FLUSH_ROUNDS {
            let outbox = self.node.take_outbox();
            if outbox.is_empty() {
                return;
            }
            for tx in &outbox.txs {
                match self.broadcaster.broadcast_tx(tx).await {
                    Ok(tx_id) => info!(%tx_id, "tx broadcast"),
                    Err(err) => {
                        warn!(tx_id = %tx.tx_id, %err, "tx broadcast failed");
                        self.node.events().emit(DaoEvent::BroadcastFailed {
                            tx_id: tx.tx_id,
                            reason: err.to_string(),
                        });
                    }
                }
            }
            for payload in outbox.payloads {
                let kind = payload.kind();
                if let Err(err) = self.peers.broadcast(payload).await {
                    warn!(?kind, %err, "payload broadcast failed");
                }
            }
            for payload in outbox.removals {
                if let Err(err) = self.peers.remove(payload).await {
                    warn!(%err, "payload removal failed");
                }
            }
            for request in &outbox.recovery {
                if let Err(err) = self.recover(request).await {
                    warn!(cycle_index = request.cycle_index, %err, "blind-vote recovery failed");
                }
            }
        }
    }

    // ── Run loop ─────────────────────────────────────────────────────────

    /// Sync, then follow new blocks and payload events until `shutdown`
    /// fires.
    pub async fn run(&mut self, mut shutdown: broadcast::Receiver<()>) -> Result<(), NodeError> {
        let mut blocks = match self.node.mode() {
            NodeMode::Full => Some(self.chain()?.subscribe()),
            NodeMode::Lite => None,
        };
        let mut payloads = self.peers.subscribe();
        if let Err(err) = self.sync().await {
            warn!(%err, "initial sync failed");
        }
        self.bootstrap_payloads();
        self.request_payloads().await;
        self.flush_outbox().await;

        let is_lite = self.node.mode() == NodeMode::Lite;
        let mut poll = tokio::time::interval(self.lite_poll_interval);
        poll.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("driver stopping");
                    break;
                }
                block = next_block(&mut blocks) => match block {
                    Ok(raw) => self.on_new_block(raw).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "block notifications lagged");
                        self.sync_logged().await;
                    }
                    Err(RecvError::Closed) => {
                        warn!("chain daemon closed its block feed");
                        break;
                    }
                },
                event = payloads.recv() => match event {
                    Ok(event) => {
                        if let Err(err) = self.node.on_payload_event(event) {
                            debug!(%err, "payload rejected");
                        }
                        self.flush_outbox().await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "payload events lagged");
                        self.bootstrap_payloads();
                    }
                    Err(RecvError::Closed) => {
                        warn!("peer network closed its payload feed");
                        break;
                    }
                },
                _ = poll.tick(), if is_lite => self.sync_logged().await,
            }
        }
        self.flush_outbox().await;
        Ok(())
    }

    async fn on_new_block(&mut self, raw: RawBlock) {
        let mut reorgs = 0;
        let result = self.node.process_raw_block(&raw);
        if let Err(err) = self.handle(result, &mut reorgs) {
            debug!(height = raw.height, %err, "notified block not applied");
        }
        self.sync_logged().await;
    }

    async fn sync_logged(&mut self) {
        if let Err(err) = self.sync().await {
            warn!(%err, "sync failed");
        }
    }
}

async fn next_block(rx: &mut Option<broadcast::Receiver<RawBlock>>) -> Result<RawBlock, RecvError> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
