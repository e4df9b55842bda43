//! The wallet collaborator: builds and signs the transactions that carry
//! DAO commitments. Key management and coin selection stay on its side.

use dao_types::{TxId, TxOutputKey};
use thiserror::Error;

/// A fully signed transaction that has not been broadcast yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTx {
    pub tx_id: TxId,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("insufficient BSQ: need {need}, have {have}")]
    InsufficientBsq { need: u64, have: u64 },

    #[error("output {0:?} is not spendable by this wallet")]
    OutputNotOwned(TxOutputKey),

    #[error("wallet error: {0}")]
    Other(String),
}

pub trait WalletService {
    /// Burns `fee` BSQ and carries `op_return`.
    fn build_fee_tx(&self, fee: u64, op_return: &[u8]) -> Result<SignedTx, WalletError>;

    /// Burns `fee` BSQ, adds an issuance-candidate output of `requested`
    /// satoshis at index 1, and carries `op_return`.
    fn build_issuance_request_tx(
        &self,
        fee: u64,
        requested: u64,
        op_return: &[u8],
    ) -> Result<SignedTx, WalletError>;

    /// Locks `stake` BSQ in output 0, burns `fee` and carries `op_return`.
    fn build_stake_tx(&self, stake: u64, fee: u64, op_return: &[u8]) -> Result<SignedTx, WalletError>;

    /// Spends `output` into output 0 and carries `op_return`.
    fn build_spend_tx(&self, output: TxOutputKey, op_return: &[u8]) -> Result<SignedTx, WalletError>;
}
