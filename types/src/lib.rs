//! Fundamental types for the BSQ DAO.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! transaction and block ids, content digests, output keys, token amounts, timestamps,
//! governance phases, output/transaction classifications and the voted parameter set.

pub mod amount;
pub mod error;
pub mod hash;
pub mod key;
pub mod keys;
pub mod network;
pub mod params;
pub mod phase;
pub mod time;
pub mod tx_type;

pub use amount::BsqAmount;
pub use error::TypeError;
pub use hash::{BlockHash, Digest, TxId};
pub use key::TxOutputKey;
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use network::NetworkId;
pub use params::{Param, ParamType};
pub use phase::Phase;
pub use time::Timestamp;
pub use tx_type::{TxOutputType, TxType};
