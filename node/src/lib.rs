//! BSQ DAO node: the parser context and its async driver.
//!
//! [`DaoNode`] owns the ledger, period engine and governance services and is
//! the only writer to them. [`NodeDriver`] connects it to the chain daemon,
//! the peer network and the tx broadcaster:
//! - full nodes parse raw blocks from the daemon
//! - lite nodes fetch classified blocks from peers and re-derive them
//! - chain-integrity failures rewind to the last known good snapshot
//! - observers follow [`DaoEvent`]s instead of touching live state

pub mod config;
pub mod driver;
pub mod error;
pub mod events;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod shutdown;
pub mod snapshot;

pub use config::{GenesisOverrides, NodeConfig, NodeMode};
pub use driver::NodeDriver;
pub use error::NodeError;
pub use events::{DaoEvent, EventBus};
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use node::{BlockOutcome, DaoNode, Outbox, SharedWallet};
pub use shutdown::ShutdownController;
pub use snapshot::SnapshotManager;
