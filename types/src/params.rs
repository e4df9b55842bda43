//! Voted DAO parameters and their compiled-in defaults.
//!
//! Every parameter has a per-network default. A parameter's value at a given
//! height is the default unless an accepted change-param proposal activated a
//! new value at or below that height (see `dao_ledger::DaoState::param_value`).

use crate::error::TypeError;
use crate::network::NetworkId;
use crate::phase::Phase;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unit and domain of a parameter value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamType {
    /// BSQ amount in satoshis; must be positive.
    Satoshi,
    /// Basis points (10 000 = 100.00%).
    Bps,
    /// Number of blocks; must be at least one.
    Blocks,
    /// Plain multiplier.
    Factor,
}

impl ParamType {
    /// Whether `value` lies in this type's domain.
    pub fn is_in_domain(&self, value: u64) -> bool {
        match self {
            Self::Satoshi | Self::Factor => value > 0,
            Self::Bps => value <= 10_000,
            Self::Blocks => value >= 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Param {
    // ── Request amounts ──────────────────────────────────────────────────
    MinCompRequestAmount,
    MaxCompRequestAmount,
    MinReimbursementRequestAmount,
    MaxReimbursementRequestAmount,

    // ── Fees ─────────────────────────────────────────────────────────────
    ProposalFee,
    BlindVoteFee,

    // ── Quorum (minimum participating stake, satoshis) ───────────────────
    QuorumCompRequest,
    QuorumReimbursement,
    QuorumChangeParam,
    QuorumBondedRole,
    QuorumConfiscation,
    QuorumGeneric,
    QuorumRemoveAsset,

    // ── Threshold (minimum acceptance ratio, bps) ────────────────────────
    ThresholdCompRequest,
    ThresholdReimbursement,
    ThresholdChangeParam,
    ThresholdBondedRole,
    ThresholdConfiscation,
    ThresholdGeneric,
    ThresholdRemoveAsset,

    // ── Bonds ────────────────────────────────────────────────────────────
    BondedRoleFactor,

    // ── Phase durations (blocks) ─────────────────────────────────────────
    PhaseUndefined,
    PhaseProposal,
    PhaseBreak1,
    PhaseBlindVote,
    PhaseBreak2,
    PhaseVoteReveal,
    PhaseBreak3,
    PhaseVoteResult,
    PhaseBreak4,
}

impl Param {
    pub const ALL: [Param; 30] = [
        Param::MinCompRequestAmount,
        Param::MaxCompRequestAmount,
        Param::MinReimbursementRequestAmount,
        Param::MaxReimbursementRequestAmount,
        Param::ProposalFee,
        Param::BlindVoteFee,
        Param::QuorumCompRequest,
        Param::QuorumReimbursement,
        Param::QuorumChangeParam,
        Param::QuorumBondedRole,
        Param::QuorumConfiscation,
        Param::QuorumGeneric,
        Param::QuorumRemoveAsset,
        Param::ThresholdCompRequest,
        Param::ThresholdReimbursement,
        Param::ThresholdChangeParam,
        Param::ThresholdBondedRole,
        Param::ThresholdConfiscation,
        Param::ThresholdGeneric,
        Param::ThresholdRemoveAsset,
        Param::BondedRoleFactor,
        Param::PhaseUndefined,
        Param::PhaseProposal,
        Param::PhaseBreak1,
        Param::PhaseBlindVote,
        Param::PhaseBreak2,
        Param::PhaseVoteReveal,
        Param::PhaseBreak3,
        Param::PhaseVoteResult,
        Param::PhaseBreak4,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::MinCompRequestAmount => "min_comp_request_amount",
            Self::MaxCompRequestAmount => "max_comp_request_amount",
            Self::MinReimbursementRequestAmount => "min_reimbursement_request_amount",
            Self::MaxReimbursementRequestAmount => "max_reimbursement_request_amount",
            Self::ProposalFee => "proposal_fee",
            Self::BlindVoteFee => "blind_vote_fee",
            Self::QuorumCompRequest => "quorum_comp_request",
            Self::QuorumReimbursement => "quorum_reimbursement",
            Self::QuorumChangeParam => "quorum_change_param",
            Self::QuorumBondedRole => "quorum_bonded_role",
            Self::QuorumConfiscation => "quorum_confiscation",
            Self::QuorumGeneric => "quorum_generic",
            Self::QuorumRemoveAsset => "quorum_remove_asset",
            Self::ThresholdCompRequest => "threshold_comp_request",
            Self::ThresholdReimbursement => "threshold_reimbursement",
            Self::ThresholdChangeParam => "threshold_change_param",
            Self::ThresholdBondedRole => "threshold_bonded_role",
            Self::ThresholdConfiscation => "threshold_confiscation",
            Self::ThresholdGeneric => "threshold_generic",
            Self::ThresholdRemoveAsset => "threshold_remove_asset",
            Self::BondedRoleFactor => "bonded_role_factor",
            Self::PhaseUndefined => "phase_undefined",
            Self::PhaseProposal => "phase_proposal",
            Self::PhaseBreak1 => "phase_break1",
            Self::PhaseBlindVote => "phase_blind_vote",
            Self::PhaseBreak2 => "phase_break2",
            Self::PhaseVoteReveal => "phase_vote_reveal",
            Self::PhaseBreak3 => "phase_break3",
            Self::PhaseVoteResult => "phase_vote_result",
            Self::PhaseBreak4 => "phase_break4",
        }
    }

    pub fn param_type(&self) -> ParamType {
        match self {
            Self::MinCompRequestAmount
            | Self::MaxCompRequestAmount
            | Self::MinReimbursementRequestAmount
            | Self::MaxReimbursementRequestAmount
            | Self::ProposalFee
            | Self::BlindVoteFee
            | Self::QuorumCompRequest
            | Self::QuorumReimbursement
            | Self::QuorumChangeParam
            | Self::QuorumBondedRole
            | Self::QuorumConfiscation
            | Self::QuorumGeneric
            | Self::QuorumRemoveAsset => ParamType::Satoshi,
            Self::ThresholdCompRequest
            | Self::ThresholdReimbursement
            | Self::ThresholdChangeParam
            | Self::ThresholdBondedRole
            | Self::ThresholdConfiscation
            | Self::ThresholdGeneric
            | Self::ThresholdRemoveAsset => ParamType::Bps,
            Self::BondedRoleFactor => ParamType::Factor,
            Self::PhaseUndefined
            | Self::PhaseProposal
            | Self::PhaseBreak1
            | Self::PhaseBlindVote
            | Self::PhaseBreak2
            | Self::PhaseVoteReveal
            | Self::PhaseBreak3
            | Self::PhaseVoteResult
            | Self::PhaseBreak4 => ParamType::Blocks,
        }
    }

    /// `PhaseUndefined` is a placeholder with zero duration and cannot be voted on.
    pub fn is_governable(&self) -> bool {
        !matches!(self, Self::PhaseUndefined)
    }

    /// The duration parameter for `phase`.
    pub fn for_phase(phase: Phase) -> Param {
        match phase {
            Phase::Undefined => Self::PhaseUndefined,
            Phase::Proposal => Self::PhaseProposal,
            Phase::Break1 => Self::PhaseBreak1,
            Phase::BlindVote => Self::PhaseBlindVote,
            Phase::Break2 => Self::PhaseBreak2,
            Phase::VoteReveal => Self::PhaseVoteReveal,
            Phase::Break3 => Self::PhaseBreak3,
            Phase::VoteResult => Self::PhaseVoteResult,
            Phase::Break4 => Self::PhaseBreak4,
        }
    }

    /// The phase whose duration this parameter controls, if any.
    pub fn phase(&self) -> Option<Phase> {
        Phase::ALL.into_iter().find(|p| Param::for_phase(*p) == *self)
    }

    /// Compiled-in default for `network`.
    pub fn default_value(&self, network: NetworkId) -> u64 {
        let regtest = network == NetworkId::Regtest;
        match self {
            Self::MinCompRequestAmount | Self::MinReimbursementRequestAmount => 1_000,
            Self::MaxCompRequestAmount | Self::MaxReimbursementRequestAmount => 10_000_000,
            Self::ProposalFee | Self::BlindVoteFee => 200,

            Self::QuorumCompRequest | Self::QuorumReimbursement if regtest => 10_000,
            Self::QuorumCompRequest | Self::QuorumReimbursement => 2_000_000,
            Self::QuorumChangeParam if regtest => 10_000,
            Self::QuorumChangeParam => 10_000_000,
            Self::QuorumBondedRole if regtest => 10_000,
            Self::QuorumBondedRole => 5_000_000,
            Self::QuorumConfiscation if regtest => 10_000,
            Self::QuorumConfiscation => 20_000_000,
            Self::QuorumGeneric if regtest => 10_000,
            Self::QuorumGeneric => 500_000,
            Self::QuorumRemoveAsset if regtest => 10_000,
            Self::QuorumRemoveAsset => 1_000_000,

            Self::ThresholdChangeParam => 7_500,
            Self::ThresholdConfiscation => 8_500,
            Self::ThresholdCompRequest
            | Self::ThresholdReimbursement
            | Self::ThresholdBondedRole
            | Self::ThresholdGeneric
            | Self::ThresholdRemoveAsset => 5_000,

            Self::BondedRoleFactor => 100_000,

            Self::PhaseUndefined => 0,
            phase_param => phase_duration_default(*phase_param, network),
        }
    }
}

fn phase_duration_default(param: Param, network: NetworkId) -> u64 {
    // proposal, break1, blind vote, break2, reveal, break3, result, break4
    let table: [u64; 8] = match network {
        NetworkId::Mainnet => [3601, 149, 451, 9, 451, 9, 10, 10],
        NetworkId::Testnet => [380, 10, 300, 10, 300, 10, 2, 10],
        NetworkId::Regtest => [4, 1, 2, 1, 2, 1, 2, 1],
    };
    match param {
        Param::PhaseProposal => table[0],
        Param::PhaseBreak1 => table[1],
        Param::PhaseBlindVote => table[2],
        Param::PhaseBreak2 => table[3],
        Param::PhaseVoteReveal => table[4],
        Param::PhaseBreak3 => table[5],
        Param::PhaseVoteResult => table[6],
        Param::PhaseBreak4 => table[7],
        _ => 0,
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Param {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| TypeError::UnknownParam(s.to_string()))
    }
}
