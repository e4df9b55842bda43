//! Governance phases of a cycle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named sub-interval of a cycle.
///
/// The declaration order is consensus-critical: phase boundaries are the
/// cumulative durations of the phases in exactly this order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Undefined,
    Proposal,
    Break1,
    BlindVote,
    Break2,
    VoteReveal,
    Break3,
    VoteResult,
    Break4,
}

impl Phase {
    /// All phases in cycle order.
    pub const ALL: [Phase; 9] = [
        Phase::Undefined,
        Phase::Proposal,
        Phase::Break1,
        Phase::BlindVote,
        Phase::Break2,
        Phase::VoteReveal,
        Phase::Break3,
        Phase::VoteResult,
        Phase::Break4,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Undefined => "UNDEFINED",
            Self::Proposal => "PROPOSAL",
            Self::Break1 => "BREAK1",
            Self::BlindVote => "BLIND_VOTE",
            Self::Break2 => "BREAK2",
            Self::VoteReveal => "VOTE_REVEAL",
            Self::Break3 => "BREAK3",
            Self::VoteResult => "VOTE_RESULT",
            Self::Break4 => "BREAK4",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
