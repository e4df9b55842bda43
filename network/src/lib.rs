//! Network seams of the DAO node.
//!
//! The governance core never touches sockets. It talks to three
//! collaborators: the base-chain daemon (raw blocks), the peer network
//! (governance payloads, blocks for lite nodes) and a transaction
//! broadcaster. Read requests run with a bounded timeout and rotate peers
//! on failure.

pub mod chain;
pub mod error;
pub mod fetch;
pub mod payload;
pub mod peer;

pub use chain::{ChainDaemon, TxBroadcaster};
pub use error::NetworkError;
pub use fetch::{fetch_blocks, fetch_payloads, with_peer_rotation, RequestPolicy, DEFAULT_REQUEST_TIMEOUT};
pub use payload::{DaoPayload, PayloadEvent, PayloadKind, StoreKind};
pub use peer::{PeerId, PeerNetwork};
