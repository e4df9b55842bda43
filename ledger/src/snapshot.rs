//! Ledger snapshots: the full DAO state at a height.
//!
//! A snapshot lets the node re-derive from a known-good point after a
//! non-connecting block or a lite-node mismatch instead of replaying from
//! genesis. The hash is computed over the canonical bincode encoding of the
//! state, so any peer holding the same chain computes the same hash.

use crate::error::LedgerError;
use crate::state::DaoState;
use dao_crypto::blake2b_256_multi;
use dao_types::Timestamp;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub hash: [u8; 32],
    pub block_height: u64,
    /// Informational; not covered by the hash.
    pub created_at: Timestamp,
    pub version: u32,
    pub state: DaoState,
}

impl LedgerSnapshot {
    pub fn create(state: DaoState) -> Result<Self, LedgerError> {
        let block_height = state.chain_height().unwrap_or_default();
        let mut snap = Self {
            hash: [0u8; 32],
            block_height,
            created_at: Timestamp::now(),
            version: SNAPSHOT_VERSION,
            state,
        };
        snap.hash = snap.compute_hash()?;
        Ok(snap)
    }

    fn compute_hash(&self) -> Result<[u8; 32], LedgerError> {
        let state_bytes = bincode::serialize(&self.state)?;
        Ok(blake2b_256_multi(&[
            &self.version.to_le_bytes(),
            &self.block_height.to_le_bytes(),
            &state_bytes,
        ]))
    }

    pub fn verify(&self) -> Result<bool, LedgerError> {
        Ok(self.hash == self.compute_hash()?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, LedgerError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        Ok(bincode::deserialize(bytes)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), LedgerError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, self.to_bytes()?)?;
        fs::rename(&tmp, path)?;
        debug!(height = self.block_height, path = %path.display(), "snapshot written");
        Ok(())
    }

    /// Read and verify a snapshot file.
    pub fn load(path: &Path) -> Result<Self, LedgerError> {
        let snap = Self::from_bytes(&fs::read(path)?)?;
        if !snap.verify()? {
            return Err(LedgerError::SnapshotCorrupt(snap.block_height));
        }
        Ok(snap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::TxBlock;
    use crate::genesis::GenesisConfig;
    use crate::ledger::Ledger;
    use dao_types::{BlockHash, NetworkId, TxId};

    fn ledger_with_blocks(n: u64) -> Ledger {
        let mut config = GenesisConfig::for_network(NetworkId::Regtest);
        config.tx_id = TxId::new([1; 32]);
        let mut ledger = Ledger::new(config);
        let start = ledger.next_height();
        let mut prev = BlockHash::ZERO;
        for h in start..start + n {
            let hash = BlockHash::new([h as u8 + 1; 32]);
            let block = TxBlock {
                height: h,
                time: Timestamp::new(h),
                hash,
                previous_hash: prev,
                txs: vec![],
            };
            ledger.append_block(block, |_, _| vec![]).unwrap();
            prev = hash;
        }
        ledger
    }

    #[test]
    fn create_and_verify() {
        let ledger = ledger_with_blocks(3);
        let snap = ledger.snapshot().unwrap();
        assert!(snap.verify().unwrap());
        assert_eq!(snap.block_height, ledger.chain_height().unwrap());
    }

    #[test]
    fn tampering_fails_verify() {
        let mut snap = ledger_with_blocks(2).snapshot().unwrap();
        snap.block_height += 1;
        assert!(!snap.verify().unwrap());
    }

    #[test]
    fn hash_ignores_creation_time() {
        let ledger = ledger_with_blocks(2);
        let mut a = ledger.snapshot().unwrap();
        let b = ledger.snapshot().unwrap();
        a.created_at = Timestamp::new(1);
        assert_eq!(a.hash, b.hash);
        assert!(a.verify().unwrap());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshots").join("dao_state.bin");
        let ledger = ledger_with_blocks(4);
        let snap = ledger.snapshot().unwrap();
        snap.save(&path).unwrap();

        let loaded = LedgerSnapshot::load(&path).unwrap();
        assert_eq!(loaded.hash, snap.hash);
        assert_eq!(loaded.state, snap.state);
    }

    #[test]
    fn restore_rewinds_ledger() {
        let mut ledger = ledger_with_blocks(2);
        let snap = ledger.snapshot().unwrap();
        let height = ledger.chain_height().unwrap();

        let next = TxBlock {
            height: height + 1,
            time: Timestamp::new(0),
            hash: BlockHash::new([0xEE; 32]),
            previous_hash: ledger.head_hash().unwrap(),
            txs: vec![],
        };
        ledger.append_block(next, |_, _| vec![]).unwrap();
        assert_eq!(ledger.chain_height(), Some(height + 1));

        ledger.restore(snap).unwrap();
        assert_eq!(ledger.chain_height(), Some(height));
    }

    #[test]
    fn corrupt_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dao_state.bin");
        let mut snap = ledger_with_blocks(1).snapshot().unwrap();
        snap.hash[0] ^= 0xFF;
        snap.save(&path).unwrap();
        assert!(matches!(
            LedgerSnapshot::load(&path),
            Err(LedgerError::SnapshotCorrupt(_))
        ));
    }
}
