//! BSQ transaction parser.
//!
//! Turns a raw base-chain block into a [`TxBlock`](dao_ledger::TxBlock) of
//! classified BSQ transactions. A transaction is resolved once every input
//! that refers to another transaction of the same block has been resolved;
//! resolution repeats over the unresolved set until a pass makes no
//! progress, bounded by the maximum number of transactions a block can hold.
//!
//! Full nodes feed [`RawBlock`]s decoded from the chain daemon. Lite nodes
//! receive already classified blocks from a peer, re-derive the
//! classification from the same raw data and reject the block on any
//! difference.

pub mod block_parser;
pub mod error;
pub mod raw;
pub mod tx_parser;
mod utxo;

pub use block_parser::{BlockParser, MAX_TXS_PER_BLOCK};
pub use error::ParseError;
pub use raw::{RawBlock, RawTx, RawTxInput, RawTxOutput};
pub use tx_parser::InvalidReason;
