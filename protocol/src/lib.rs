//! On-chain wire format of DAO commitments.
//!
//! Every governance commitment is carried in the last output of a base-chain
//! transaction as an OP_RETURN payload:
//!
//! ```text
//! [1-byte protocol tag][1-byte version][payload]
//! ```
//!
//! The payload is a 20-byte content digest for proposals and blind votes,
//! `secret key || blind-vote-list digest` for reveals, and
//! `lock reason || lock time || bond hash` for bond lockups.

pub mod error;
pub mod op_return;
pub mod version;

pub use error::OpReturnError;
pub use op_return::{decode, encode, LockReason, OpReturnData, OpReturnType, MAX_OP_RETURN_LEN};
pub use version::DAO_PROTOCOL_VERSION;
