//! State-change events folded into a block at append time.

use dao_types::{Digest, Param, TxId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssuanceKind {
    Compensation,
    Reimbursement,
}

/// A derived change to DAO state contributed by a block listener.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateChangeEvent {
    /// A parameter takes `value` from `activation_height` on. `recorded_height`
    /// is the height of the block that produced the change.
    ParamChange {
        param: Param,
        value: u64,
        recorded_height: u64,
        activation_height: u64,
    },
    ProposalConfirmed {
        tx_id: TxId,
        commitment: Digest,
    },
    BlindVoteConfirmed {
        tx_id: TxId,
        commitment: Digest,
        stake: u64,
    },
    /// Output 1 of `tx_id` becomes spendable BSQ.
    Issuance {
        tx_id: TxId,
        amount: u64,
        kind: IssuanceKind,
    },
    /// The lockup output of `lockup_tx_id` (or the unlock output spending it)
    /// is destroyed.
    BondConfiscated { lockup_tx_id: TxId },
    AssetRemoved { ticker: String },
    BondedRoleAccepted {
        proposal_tx_id: TxId,
        role: String,
        required_bond: u64,
    },
}
