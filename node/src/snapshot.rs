//! Snapshot rotation for reorg handling.
//!
//! Every `grid` blocks a fresh snapshot becomes the candidate and the
//! previous candidate is promoted to last known good. A reorg restores the
//! last known good snapshot, which is always at least one grid below the
//! head.

use dao_ledger::{Ledger, LedgerSnapshot};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::NodeError;

#[derive(Debug)]
pub struct SnapshotManager {
    grid: u64,
    candidate: Option<LedgerSnapshot>,
    last_good: Option<LedgerSnapshot>,
    /// Where the last known good snapshot is written on promotion.
    path: Option<PathBuf>,
}

impl SnapshotManager {
    pub fn new(grid: u64) -> Self {
        Self {
            grid: grid.max(1),
            candidate: None,
            last_good: None,
            path: None,
        }
    }

    pub fn with_path(grid: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::new(grid)
        }
    }

    /// Read a persisted snapshot, if one exists.
    pub fn load_persisted(path: &Path) -> Result<Option<LedgerSnapshot>, NodeError> {
        if !path.exists() {
            return Ok(None);
        }
        let snapshot = LedgerSnapshot::load(path)?;
        info!(height = snapshot.block_height, path = %path.display(), "persisted snapshot loaded");
        Ok(Some(snapshot))
    }

    /// Take a candidate if `height` is on the grid. Returns whether a
    /// snapshot was taken.
    pub fn on_block(&mut self, ledger: &Ledger, height: u64) -> Result<bool, NodeError> {
        if height % self.grid != 0 {
            return Ok(false);
        }
        let snapshot = ledger.snapshot()?;
        debug!(height, "snapshot candidate taken");
        if let Some(previous) = self.candidate.replace(snapshot) {
            self.last_good = Some(previous);
        }
        if let (Some(path), Some(good)) = (&self.path, &self.last_good) {
            good.save(path)?;
        }
        Ok(true)
    }

    /// Seed the last known good snapshot, e.g. from disk at startup.
    pub fn set_last_good(&mut self, snapshot: LedgerSnapshot) {
        self.last_good = Some(snapshot);
    }

    pub fn last_good(&self) -> Option<&LedgerSnapshot> {
        self.last_good.as_ref()
    }

    pub fn candidate(&self) -> Option<&LedgerSnapshot> {
        self.candidate.as_ref()
    }

    /// The last known good snapshot if it lies below `height`.
    pub fn reorg_point(&self, height: u64) -> Option<&LedgerSnapshot> {
        self.last_good.as_ref().filter(|s| s.block_height < height)
    }

    /// The newest snapshot below `height`.
    pub fn latest_below(&self, height: u64) -> Option<&LedgerSnapshot> {
        [self.candidate.as_ref(), self.last_good.as_ref()]
            .into_iter()
            .flatten()
            .filter(|s| s.block_height < height)
            .max_by_key(|s| s.block_height)
    }

    /// Forget snapshots above `height` after the ledger was rewound to it.
    pub fn truncate(&mut self, height: u64) {
        if self.candidate.as_ref().is_some_and(|s| s.block_height > height) {
            self.candidate = None;
        }
        if self.last_good.as_ref().is_some_and(|s| s.block_height > height) {
            self.last_good = None;
        }
    }

    /// Drop everything, forcing the next re-derivation to start at genesis.
    pub fn clear(&mut self) {
        self.candidate = None;
        self.last_good = None;
    }
}
