//! Base-chain collaborators: the daemon serving raw blocks and the
//! broadcaster for signed transactions.

use crate::error::NetworkError;
use async_trait::async_trait;
use dao_governance::SignedTx;
use dao_parser::RawBlock;
use dao_types::{BlockHash, TxId};
use tokio::sync::broadcast;

#[async_trait]
pub trait ChainDaemon: Send + Sync {
    async fn chain_height(&self) -> Result<u64, NetworkError>;

    async fn block_at(&self, height: u64) -> Result<RawBlock, NetworkError>;

    async fn block_by_hash(&self, hash: &BlockHash) -> Result<RawBlock, NetworkError>;

    /// New blocks as the daemon sees them.
    fn subscribe(&self) -> broadcast::Receiver<RawBlock>;
}

#[async_trait]
pub trait TxBroadcaster: Send + Sync {
    /// Publish a signed tx. Never retried here: the caller decides.
    async fn broadcast_tx(&self, tx: &SignedTx) -> Result<TxId, NetworkError>;
}
