//! Nullable peer network: scripted peers, recorded broadcasts.

use async_trait::async_trait;
use dao_ledger::Block;
use dao_network::{DaoPayload, NetworkError, PayloadEvent, PayloadKind, PeerId, PeerNetwork};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;

/// How a scripted peer answers requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeerBehavior {
    Serve,
    /// Answers with an error.
    Fail,
    /// Never answers; the caller's timeout fires.
    Silent,
}

#[derive(Default)]
struct PeerState {
    behavior: BTreeMap<PeerId, PeerBehavior>,
    blocks: BTreeMap<PeerId, Vec<Block>>,
    payloads: BTreeMap<PeerId, Vec<DaoPayload>>,
    known: Vec<DaoPayload>,
    broadcast: Vec<DaoPayload>,
    removed: Vec<DaoPayload>,
    requests: Vec<PeerId>,
}

pub struct NullPeerNetwork {
    state: Mutex<PeerState>,
    events: broadcast::Sender<PayloadEvent>,
}

impl NullPeerNetwork {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            state: Mutex::new(PeerState::default()),
            events,
        }
    }

    pub fn add_peer(&self, peer: PeerId, behavior: PeerBehavior) {
        self.lock().behavior.insert(peer, behavior);
    }

    /// Blocks `peer` serves for any `from_height` (filtered on request).
    pub fn set_blocks(&self, peer: &PeerId, blocks: Vec<Block>) {
        self.lock().blocks.insert(peer.clone(), blocks);
    }

    pub fn set_payloads(&self, peer: &PeerId, payloads: Vec<DaoPayload>) {
        self.lock().payloads.insert(peer.clone(), payloads);
    }

    /// Deliver a store change from the network to subscribers.
    pub fn deliver(&self, event: PayloadEvent) {
        {
            let mut state = self.lock();
            match &event {
                PayloadEvent::Added(p) => state.known.push(p.clone()),
                PayloadEvent::Removed(p) => state.known.retain(|k| k != p),
            }
        }
        let _ = self.events.send(event);
    }

    /// Payloads broadcast by the node, oldest first.
    pub fn broadcast_payloads(&self) -> Vec<DaoPayload> {
        self.lock().broadcast.clone()
    }

    pub fn take_broadcast(&self) -> Vec<DaoPayload> {
        std::mem::take(&mut self.lock().broadcast)
    }

    pub fn removed_payloads(&self) -> Vec<DaoPayload> {
        self.lock().removed.clone()
    }

    /// Peers asked, in request order.
    pub fn requests(&self) -> Vec<PeerId> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PeerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the request and return the peer's behavior.
    fn request(&self, peer: &PeerId) -> PeerBehavior {
        let mut state = self.lock();
        state.requests.push(peer.clone());
        state.behavior.get(peer).copied().unwrap_or(PeerBehavior::Fail)
    }
}

impl Default for NullPeerNetwork {
    fn default() -> Self {
        Self::new()
    }
}

async fn answer<T>(peer: &PeerId, behavior: PeerBehavior, value: T) -> Result<T, NetworkError> {
    match behavior {
        PeerBehavior::Serve => Ok(value),
        PeerBehavior::Fail => Err(NetworkError::Peer {
            peer: peer.clone(),
            message: "scripted failure".into(),
        }),
        PeerBehavior::Silent => {
            tokio::time::sleep(Duration::from_secs(24 * 3_600)).await;
            Err(NetworkError::Timeout {
                peer: peer.clone(),
                secs: 24 * 3_600,
            })
        }
    }
}

#[async_trait]
impl PeerNetwork for NullPeerNetwork {
    fn peers(&self) -> Vec<PeerId> {
        self.lock().behavior.keys().cloned().collect()
    }

    async fn broadcast(&self, payload: DaoPayload) -> Result<(), NetworkError> {
        let mut state = self.lock();
        state.known.push(payload.clone());
        state.broadcast.push(payload);
        Ok(())
    }

    async fn remove(&self, payload: DaoPayload) -> Result<(), NetworkError> {
        let mut state = self.lock();
        state.known.retain(|k| k != &payload);
        state.removed.push(payload);
        Ok(())
    }

    async fn request_blocks(&self, peer: &PeerId, from_height: u64) -> Result<Vec<Block>, NetworkError> {
        let behavior = self.request(peer);
        let blocks: Vec<Block> = self
            .lock()
            .blocks
            .get(peer)
            .map(|b| b.iter().filter(|b| b.height >= from_height).cloned().collect())
            .unwrap_or_default();
        answer(peer, behavior, blocks).await
    }

    async fn request_payloads(&self, peer: &PeerId, kind: PayloadKind) -> Result<Vec<DaoPayload>, NetworkError> {
        let behavior = self.request(peer);
        let payloads: Vec<DaoPayload> = self
            .lock()
            .payloads
            .get(peer)
            .map(|p| p.iter().filter(|p| p.kind() == kind).cloned().collect())
            .unwrap_or_default();
        answer(peer, behavior, payloads).await
    }

    fn known_payloads(&self, kind: PayloadKind) -> Vec<DaoPayload> {
        let state = self.lock();
        let mut seen = BTreeSet::new();
        state
            .known
            .iter()
            .filter(|p| p.kind() == kind)
            .filter(|p| p.to_bytes().map(|b| seen.insert(b)).unwrap_or(false))
            .cloned()
            .collect()
    }

    fn subscribe(&self) -> broadcast::Receiver<PayloadEvent> {
        self.events.subscribe()
    }
}
