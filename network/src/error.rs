use crate::peer::PeerId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("request to {peer} timed out after {secs}s")]
    Timeout { peer: PeerId, secs: u64 },

    #[error("no peers available")]
    NoPeers,

    #[error("all {attempts} peers failed")]
    AllPeersFailed { attempts: usize },

    #[error("peer {peer}: {message}")]
    Peer { peer: PeerId, message: String },

    #[error("chain daemon: {0}")]
    Daemon(String),

    #[error("broadcast failed: {0}")]
    Broadcast(String),

    #[error("channel closed")]
    ChannelClosed,

    #[error("encoding: {0}")]
    Encoding(#[from] bincode::Error),
}
