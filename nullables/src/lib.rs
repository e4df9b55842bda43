//! Nullable infrastructure for deterministic testing.
//!
//! Every collaborator the DAO node talks to (wallet, chain daemon, peer
//! network, tx broadcaster) has an in-memory stand-in here that:
//! - returns scripted, deterministic values
//! - records what the node sent, for assertions
//! - never touches the filesystem or network
//!
//! Usage: hand these to the node in place of the real collaborators.

pub mod chain;
pub mod network;
pub mod wallet;

pub use chain::{block_hash, NullBroadcaster, NullChainDaemon, RawBlockBuilder};
pub use network::{NullPeerNetwork, PeerBehavior};
pub use wallet::{decode_signed_tx, NullWallet};
