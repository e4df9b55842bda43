//! Peer-to-peer collaborator.

use crate::error::NetworkError;
use crate::payload::{DaoPayload, PayloadEvent, PayloadKind};
use async_trait::async_trait;
use dao_ledger::Block;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait PeerNetwork: Send + Sync {
    /// Peers currently connected, in preference order.
    fn peers(&self) -> Vec<PeerId>;

    /// Publish a payload to the network's store for its kind.
    async fn broadcast(&self, payload: DaoPayload) -> Result<(), NetworkError>;

    /// Remove an own hash-map payload from the network.
    async fn remove(&self, payload: DaoPayload) -> Result<(), NetworkError>;

    /// Classified blocks from `from_height` on, as known by `peer`. Lite
    /// nodes bootstrap from these.
    async fn request_blocks(&self, peer: &PeerId, from_height: u64) -> Result<Vec<Block>, NetworkError>;

    /// Payloads of `kind` held by `peer`.
    async fn request_payloads(&self, peer: &PeerId, kind: PayloadKind) -> Result<Vec<DaoPayload>, NetworkError>;

    /// Payloads of `kind` already received from the network.
    fn known_payloads(&self, kind: PayloadKind) -> Vec<DaoPayload>;

    /// Store changes as they arrive.
    fn subscribe(&self) -> broadcast::Receiver<PayloadEvent>;
}
