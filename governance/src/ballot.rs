//! Ballots: a confirmed proposal plus the local voter's choice.

use crate::proposal::Proposal;
use dao_types::TxId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub accepted: bool,
}

impl Vote {
    pub const ACCEPT: Vote = Vote { accepted: true };
    pub const REJECT: Vote = Vote { accepted: false };
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub proposal: Proposal,
    /// `None` abstains on this proposal.
    pub vote: Option<Vote>,
}

impl Ballot {
    pub fn tx_id(&self) -> Option<TxId> {
        self.proposal.tx_id
    }
}

/// Ballots sorted by proposal tx id, the order every node reproduces.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotList(Vec<Ballot>);

impl BallotList {
    pub fn new(mut ballots: Vec<Ballot>) -> Self {
        ballots.sort_by_key(Ballot::tx_id);
        Self(ballots)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ballot> {
        self.0.iter()
    }

    pub fn find(&self, tx_id: &TxId) -> Option<&Ballot> {
        self.0.iter().find(|b| b.tx_id().as_ref() == Some(tx_id))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The local voter's choices, keyed by proposal tx id.
#[derive(Clone, Debug, Default)]
pub struct BallotListService {
    votes: BTreeMap<TxId, Vote>,
}

impl BallotListService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record or clear the vote on a proposal.
    pub fn set_vote(&mut self, proposal_tx_id: TxId, vote: Option<Vote>) {
        debug!(%proposal_tx_id, ?vote, "vote set");
        match vote {
            Some(v) => self.votes.insert(proposal_tx_id, v),
            None => self.votes.remove(&proposal_tx_id),
        };
    }

    pub fn vote(&self, proposal_tx_id: &TxId) -> Option<Vote> {
        self.votes.get(proposal_tx_id).copied()
    }

    /// Ballots for `proposals`, carrying the recorded votes.
    pub fn ballot_list<'a>(&self, proposals: impl IntoIterator<Item = &'a Proposal>) -> BallotList {
        BallotList::new(
            proposals
                .into_iter()
                .map(|p| Ballot {
                    proposal: p.clone(),
                    vote: p.tx_id.and_then(|id| self.vote(&id)),
                })
                .collect(),
        )
    }
}
