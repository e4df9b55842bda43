//! Read requests with a per-request timeout and peer rotation.
//!
//! A request goes to one peer at a time. On timeout or failure the next
//! peer is tried, until one answers or `max_attempts` peers have failed.
//! Writes (broadcasts) are never routed through here.

use crate::error::NetworkError;
use crate::payload::{DaoPayload, PayloadKind};
use crate::peer::{PeerId, PeerNetwork};
use dao_ledger::Block;
use rand::seq::SliceRandom;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestPolicy {
    pub timeout: Duration,
    pub max_attempts: usize,
    /// Shuffle the peer list before rotating through it.
    pub shuffle: bool,
}

impl Default for RequestPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_REQUEST_TIMEOUT,
            max_attempts: 4,
            shuffle: true,
        }
    }
}

/// Run `request` against `peers` in turn until one succeeds.
pub async fn with_peer_rotation<T, F, Fut>(
    mut peers: Vec<PeerId>,
    policy: &RequestPolicy,
    mut request: F,
) -> Result<(PeerId, T), NetworkError>
where
    F: FnMut(PeerId) -> Fut,
    Fut: Future<Output = Result<T, NetworkError>>,
{
    if peers.is_empty() {
        return Err(NetworkError::NoPeers);
    }
    if policy.shuffle {
        peers.shuffle(&mut rand::thread_rng());
    }

    let mut attempts = 0;
    for peer in peers.into_iter().take(policy.max_attempts.max(1)) {
        attempts += 1;
        let err = match tokio::time::timeout(policy.timeout, request(peer.clone())).await {
            Ok(Ok(value)) => {
                debug!(%peer, attempts, "request served");
                return Ok((peer, value));
            }
            Ok(Err(err)) => err,
            Err(_) => NetworkError::Timeout {
                peer,
                secs: policy.timeout.as_secs(),
            },
        };
        warn!(%err, attempts, "request failed, rotating peer");
    }
    Err(NetworkError::AllPeersFailed { attempts })
}

/// Classified blocks from `from_height` on, from the first peer that serves
/// them.
pub async fn fetch_blocks(
    network: &dyn PeerNetwork,
    from_height: u64,
    policy: &RequestPolicy,
) -> Result<(PeerId, Vec<Block>), NetworkError> {
    with_peer_rotation(network.peers(), policy, |peer| async move {
        network.request_blocks(&peer, from_height).await
    })
    .await
}

/// Payloads of `kind` from the first peer that serves them.
pub async fn fetch_payloads(
    network: &dyn PeerNetwork,
    kind: PayloadKind,
    policy: &RequestPolicy,
) -> Result<(PeerId, Vec<DaoPayload>), NetworkError> {
    with_peer_rotation(network.peers(), policy, |peer| async move {
        network.request_payloads(&peer, kind).await
    })
    .await
}
