//! Ledger state of the BSQ DAO.
//!
//! An append-only, height-indexed record of parsed blocks together with the
//! indexes every later stage reads: the unspent BSQ output set, spent-info,
//! voted parameter history, issuance and bond records.
//!
//! The ledger is written from a single parser context. `append_block` is the
//! only mutation; it checks chain connectivity, folds the block's transactions
//! into the output indexes, collects the state-change events contributed by
//! block listeners and applies them. Once it returns, the block and its event
//! set are final.

pub mod block;
pub mod error;
pub mod event;
pub mod genesis;
pub mod ledger;
pub mod listener;
pub mod snapshot;
pub mod state;
pub mod tx;

pub use block::{Block, TxBlock};
pub use error::LedgerError;
pub use event::{IssuanceKind, StateChangeEvent};
pub use genesis::GenesisConfig;
pub use ledger::Ledger;
pub use listener::{BlockListener, BlockListeners, ListenerId};
pub use snapshot::LedgerSnapshot;
pub use state::{BondedRoleRecord, DaoState, Issuance, ParamChange, SpentInfo};
pub use tx::{Tx, TxInput, TxOutput};
