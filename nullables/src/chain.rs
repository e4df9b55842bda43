//! Nullable base chain: a daemon serving scripted raw blocks, a block
//! builder, and a broadcaster that records what it is given.

use crate::wallet::decode_signed_tx;
use async_trait::async_trait;
use dao_governance::SignedTx;
use dao_network::{ChainDaemon, NetworkError, TxBroadcaster};
use dao_parser::{RawBlock, RawTx};
use dao_types::{BlockHash, Timestamp, TxId};
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;
use tracing::debug;

const BLOCK_INTERVAL_SECS: u64 = 600;

/// Builds a connected run of raw blocks. `fork` distinguishes the hashes
/// of competing branches at the same height.
#[derive(Clone, Debug)]
pub struct RawBlockBuilder {
    next_height: u64,
    previous_hash: BlockHash,
    fork: u8,
}

impl RawBlockBuilder {
    pub fn new(first_height: u64) -> Self {
        Self {
            next_height: first_height,
            previous_hash: BlockHash::ZERO,
            fork: 0,
        }
    }

    /// Continue from `previous` on branch `fork`.
    pub fn after(previous: &RawBlock, fork: u8) -> Self {
        Self {
            next_height: previous.height + 1,
            previous_hash: previous.hash,
            fork,
        }
    }

    pub fn next_height(&self) -> u64 {
        self.next_height
    }

    pub fn block(&mut self, txs: Vec<RawTx>) -> RawBlock {
        let height = self.next_height;
        let block = RawBlock {
            height,
            time: Timestamp::new(1_600_000_000 + height * BLOCK_INTERVAL_SECS),
            hash: block_hash(height, self.fork),
            previous_hash: self.previous_hash,
            txs,
        };
        self.next_height += 1;
        self.previous_hash = block.hash;
        block
    }

    pub fn empty(&mut self) -> RawBlock {
        self.block(Vec::new())
    }
}

pub fn block_hash(height: u64, fork: u8) -> BlockHash {
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&height.to_be_bytes());
    bytes[8] = fork;
    bytes[31] = 0xB5;
    BlockHash::new(bytes)
}

/// A chain daemon over an in-memory list of blocks.
pub struct NullChainDaemon {
    blocks: Mutex<Vec<RawBlock>>,
    sender: broadcast::Sender<RawBlock>,
}

impl NullChainDaemon {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self {
            blocks: Mutex::new(Vec::new()),
            sender,
        }
    }

    pub fn with_blocks(blocks: Vec<RawBlock>) -> Self {
        let daemon = Self::new();
        *daemon.lock() = blocks;
        daemon
    }

    /// Append a block and notify subscribers.
    pub fn push_block(&self, block: RawBlock) {
        debug!(height = block.height, "null daemon: new block");
        self.lock().push(block.clone());
        // no subscribers is fine
        let _ = self.sender.send(block);
    }

    /// Replace every block from `block.height` on, as a reorg would.
    pub fn reorg_to(&self, block: RawBlock) {
        self.lock().retain(|b| b.height < block.height);
        self.push_block(block);
    }

    pub fn blocks(&self) -> Vec<RawBlock> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RawBlock>> {
        self.blocks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for NullChainDaemon {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainDaemon for NullChainDaemon {
    async fn chain_height(&self) -> Result<u64, NetworkError> {
        self.lock()
            .last()
            .map(|b| b.height)
            .ok_or_else(|| NetworkError::Daemon("no blocks".into()))
    }

    async fn block_at(&self, height: u64) -> Result<RawBlock, NetworkError> {
        self.lock()
            .iter()
            .find(|b| b.height == height)
            .cloned()
            .ok_or_else(|| NetworkError::Daemon(format!("no block at {height}")))
    }

    async fn block_by_hash(&self, hash: &BlockHash) -> Result<RawBlock, NetworkError> {
        self.lock()
            .iter()
            .find(|b| &b.hash == hash)
            .cloned()
            .ok_or_else(|| NetworkError::Daemon(format!("no block {hash}")))
    }

    fn subscribe(&self) -> broadcast::Receiver<RawBlock> {
        self.sender.subscribe()
    }
}

/// Records broadcast txs so tests can mine them into the next block.
#[derive(Default)]
pub struct NullBroadcaster {
    sent: Mutex<Vec<SignedTx>>,
    fail_with: Mutex<Option<String>>,
}

impl NullBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following broadcast fail.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.fail_with.lock().unwrap_or_else(PoisonError::into_inner) = Some(message.into());
    }

    pub fn sent(&self) -> Vec<SignedTx> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Drain the recorded txs in raw form.
    pub fn take_raw_txs(&self) -> Result<Vec<RawTx>, bincode::Error> {
        let sent = std::mem::take(&mut *self.sent.lock().unwrap_or_else(PoisonError::into_inner));
        sent.iter().map(decode_signed_tx).collect()
    }
}

#[async_trait]
impl TxBroadcaster for NullBroadcaster {
    async fn broadcast_tx(&self, tx: &SignedTx) -> Result<TxId, NetworkError> {
        if let Some(message) = self.fail_with.lock().unwrap_or_else(PoisonError::into_inner).clone() {
            return Err(NetworkError::Broadcast(message));
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx.clone());
        Ok(tx.tx_id)
    }
}
