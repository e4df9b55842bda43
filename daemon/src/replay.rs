//! Offline replay of a raw block dump through a full node.
//!
//! The dump is a JSON array of raw blocks. It stands in for the base-chain
//! daemon; the peer network and broadcaster are offline, so nothing the
//! node publishes leaves the process.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use dao_governance::SignedTx;
use dao_ledger::{Block, IssuanceKind, StateChangeEvent};
use dao_network::{ChainDaemon, DaoPayload, NetworkError, PayloadEvent, PayloadKind, PeerId, PeerNetwork, TxBroadcaster};
use dao_node::{DaoEvent, DaoNode, NodeConfig, NodeDriver, NodeMode};
use dao_parser::RawBlock;
use dao_period::Cycle;
use dao_types::{BlockHash, TxId};
use dao_voting::VoteResultOutcome;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Raw blocks loaded from a dump, served by height or hash.
pub struct FileChain {
    blocks: Vec<RawBlock>,
    sender: broadcast::Sender<RawBlock>,
}

impl FileChain {
    pub fn new(mut blocks: Vec<RawBlock>) -> Self {
        blocks.sort_by_key(|b| b.height);
        let (sender, _) = broadcast::channel(16);
        Self { blocks, sender }
    }

    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let blocks: Vec<RawBlock> =
            serde_json::from_str(&content).with_context(|| format!("decoding block dump {}", path.display()))?;
        info!(path = %path.display(), blocks = blocks.len(), "block dump loaded");
        Ok(Self::new(blocks))
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[async_trait]
impl ChainDaemon for FileChain {
    async fn chain_height(&self) -> Result<u64, NetworkError> {
        self.blocks
            .last()
            .map(|b| b.height)
            .ok_or_else(|| NetworkError::Daemon("empty block dump".into()))
    }

    async fn block_at(&self, height: u64) -> Result<RawBlock, NetworkError> {
        self.blocks
            .binary_search_by_key(&height, |b| b.height)
            .map(|i| self.blocks[i].clone())
            .map_err(|_| NetworkError::Daemon(format!("no block at {height} in dump")))
    }

    async fn block_by_hash(&self, hash: &BlockHash) -> Result<RawBlock, NetworkError> {
        self.blocks
            .iter()
            .find(|b| &b.hash == hash)
            .cloned()
            .ok_or_else(|| NetworkError::Daemon(format!("no block {hash} in dump")))
    }

    fn subscribe(&self) -> broadcast::Receiver<RawBlock> {
        self.sender.subscribe()
    }
}

/// A peer network with no peers.
pub struct OfflinePeers {
    events: broadcast::Sender<PayloadEvent>,
}

impl OfflinePeers {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self { events }
    }
}

impl Default for OfflinePeers {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PeerNetwork for OfflinePeers {
    fn peers(&self) -> Vec<PeerId> {
        Vec::new()
    }

    async fn broadcast(&self, payload: DaoPayload) -> Result<(), NetworkError> {
        debug!(kind = ?payload.kind(), "offline: payload not published");
        Ok(())
    }

    async fn remove(&self, _payload: DaoPayload) -> Result<(), NetworkError> {
        Ok(())
    }

    async fn request_blocks(&self, _peer: &PeerId, _from_height: u64) -> Result<Vec<Block>, NetworkError> {
        Err(NetworkError::NoPeers)
    }

    async fn request_payloads(&self, _peer: &PeerId, _kind: PayloadKind) -> Result<Vec<DaoPayload>, NetworkError> {
        Err(NetworkError::NoPeers)
    }

    fn known_payloads(&self, _kind: PayloadKind) -> Vec<DaoPayload> {
        Vec::new()
    }

    fn subscribe(&self) -> broadcast::Receiver<PayloadEvent> {
        self.events.subscribe()
    }
}

pub struct OfflineBroadcaster;

#[async_trait]
impl TxBroadcaster for OfflineBroadcaster {
    async fn broadcast_tx(&self, tx: &SignedTx) -> Result<TxId, NetworkError> {
        Err(NetworkError::Broadcast(format!("offline replay, tx {} dropped", tx.tx_id)))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuanceLine {
    pub height: u64,
    pub tx_id: TxId,
    pub amount: u64,
    pub kind: IssuanceKind,
}

/// What a replay derived.
#[derive(Debug, Default)]
pub struct ReplayReport {
    pub appended: u64,
    pub head: Option<u64>,
    pub cycles: Vec<Cycle>,
    pub outcomes: Vec<VoteResultOutcome>,
    pub issuance: Vec<IssuanceLine>,
    /// Height and reason of every rejected block.
    pub failures: Vec<(u64, String)>,
    /// Prometheus text exposition, when metrics are enabled.
    pub metrics: Option<String>,
}

/// Feed `chain` through a full node built from `config`.
pub async fn replay(mut config: NodeConfig, chain: FileChain) -> anyhow::Result<ReplayReport> {
    config.mode = NodeMode::Full;
    let enable_metrics = config.enable_metrics;
    let node = DaoNode::new(config)?;
    let mut events = node.subscribe();
    let mut driver = NodeDriver::new(node, Arc::new(OfflinePeers::new()), Arc::new(OfflineBroadcaster))
        .with_chain(Arc::new(chain));
    let appended = driver.sync().await?;

    let mut failures = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let DaoEvent::ParseFailed { height, reason } = event {
            failures.push((height, reason));
        }
    }

    let node = driver.node();
    let issuance = node
        .ledger()
        .blocks_from(node.ledger().genesis().block_height)
        .iter()
        .flat_map(|block| {
            block.events.iter().filter_map(move |event| match event {
                StateChangeEvent::Issuance { tx_id, amount, kind } => Some(IssuanceLine {
                    height: block.height,
                    tx_id: *tx_id,
                    amount: *amount,
                    kind: *kind,
                }),
                _ => None,
            })
        })
        .collect();

    Ok(ReplayReport {
        appended,
        head: node.chain_height(),
        cycles: node.period_snapshot().cycles,
        outcomes: node.results().outcomes().to_vec(),
        issuance,
        failures,
        metrics: if enable_metrics {
            Some(node.metrics().encode()?)
        } else {
            None
        },
    })
}

impl fmt::Display for ReplayReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.head {
            Some(head) => writeln!(f, "blocks appended: {} (head {head})", self.appended)?,
            None => writeln!(f, "blocks appended: {}", self.appended)?,
        }
        for (index, cycle) in self.cycles.iter().enumerate() {
            writeln!(
                f,
                "cycle {index}: blocks {}..={}",
                cycle.height_of_first_block(),
                cycle.height_of_last_block()
            )?;
            for phase in cycle.phases() {
                if let Some(range) = cycle.phase_range(phase.phase) {
                    writeln!(f, "  {:<12} {}..={}", phase.phase.to_string(), range.start(), range.end())?;
                }
            }
        }
        for outcome in &self.outcomes {
            match outcome {
                VoteResultOutcome::Completed(result) => {
                    writeln!(
                        f,
                        "vote result cycle {} at {}: {} blind votes counted",
                        result.cycle_index,
                        result.height,
                        result.counted_blind_votes.len()
                    )?;
                    for e in &result.evaluated {
                        writeln!(
                            f,
                            "  {} ({}): {:?}, accepted {} rejected {}",
                            e.proposal.name, e.proposal.uid, e.outcome, e.accepted_stake, e.rejected_stake
                        )?;
                    }
                }
                VoteResultOutcome::Deferred { request, error } => writeln!(
                    f,
                    "vote result cycle {} at {} deferred: {error} ({} blind votes missing)",
                    request.cycle_index,
                    request.height,
                    request.missing_blind_votes.len()
                )?,
            }
        }
        for line in &self.issuance {
            writeln!(f, "issued {} BSQ at {} ({:?}, {})", line.amount, line.height, line.kind, line.tx_id)?;
        }
        for (height, reason) in &self.failures {
            writeln!(f, "rejected block {height}: {reason}")?;
        }
        if let Some(metrics) = &self.metrics {
            write!(f, "{metrics}")?;
        }
        Ok(())
    }
}
