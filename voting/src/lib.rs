//! Blind voting for the BSQ DAO.
//!
//! A cycle's vote runs in three phases:
//!
//! - **Blind vote**: the voter encrypts its ballot list under a fresh key and
//!   locks a stake in a tx whose OP_RETURN commits to the ciphertext digest.
//! - **Vote reveal**: the voter spends the stake in a tx disclosing the key
//!   and a digest of its view of the cycle's blind votes.
//! - **Vote result**: at the first block of the result phase every node
//!   picks the stake-weighted majority view, reconciles its own list against
//!   it, decrypts the revealed ballots and tallies each proposal against its
//!   quorum and threshold.
//!
//! Reveals of blind votes the node does not hold sit out the tally and are
//! requested from peers. A node whose blind-vote list cannot be reconciled
//! with the majority of the remaining reveals defers its tally and asks
//! peers for the missing data.

pub mod blind_vote;
pub mod blind_vote_service;
pub mod error;
pub mod my_votes;
pub mod result;
pub mod reveal;
pub mod tally;
pub mod validation;

pub use blind_vote::{BlindVote, BlindVoteKey, BlindVotePayload, VoteWithProposalTxId};
pub use blind_vote_service::BlindVoteService;
pub use error::{BlindVoteValidationError, VoteCodecError, VoteResultError, VoteRevealError, VotingError};
pub use my_votes::{MyVote, MyVoteList, VoteStatus};
pub use result::{CycleResult, RecoveryRequest, RevealedVote, VoteResultOutcome, VoteResultService};
pub use reveal::VoteRevealService;
pub use tally::{EvaluatedProposal, ProposalOutcome};
pub use validation::BlindVoteValidator;
