//! The local voter's own blind votes and where each stands.

use dao_crypto::SecretKey;
use dao_governance::BallotList;
use dao_types::TxId;
use serde::{Deserialize, Serialize};

/// `Committed -> Revealed -> Tallied`. A cycle the voter never committed to
/// has no entry in [`MyVoteList`] at all; that absence is the "no vote"
/// state, and [`MyVoteList::status`] reports it as `None`. A vote never
/// revealed stays `Committed` and is left out of its cycle's tally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteStatus {
    Committed,
    Revealed { reveal_tx_id: TxId },
    Tallied,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MyVote {
    pub blind_vote_tx_id: TxId,
    pub ballots: BallotList,
    pub secret_key: SecretKey,
    pub stake: u64,
    pub status: VoteStatus,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MyVoteList {
    votes: Vec<MyVote>,
}

impl MyVoteList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, vote: MyVote) {
        self.votes.push(vote);
    }

    pub fn get(&self, blind_vote_tx_id: &TxId) -> Option<&MyVote> {
        self.votes.iter().find(|v| &v.blind_vote_tx_id == blind_vote_tx_id)
    }

    /// `None` until a blind vote for `blind_vote_tx_id` is committed.
    pub fn status(&self, blind_vote_tx_id: &TxId) -> Option<VoteStatus> {
        self.get(blind_vote_tx_id).map(|v| v.status)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MyVote> {
        self.votes.iter()
    }

    pub fn committed(&self) -> impl Iterator<Item = &MyVote> {
        self.votes
            .iter()
            .filter(|v| v.status == VoteStatus::Committed)
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    /// Returns false unless the vote was `Committed`.
    pub fn mark_revealed(&mut self, blind_vote_tx_id: &TxId, reveal_tx_id: TxId) -> bool {
        self.transition(blind_vote_tx_id, |status| {
            matches!(status, VoteStatus::Committed).then_some(VoteStatus::Revealed { reveal_tx_id })
        })
    }

    /// Returns false unless the vote was `Revealed`.
    pub fn mark_tallied(&mut self, blind_vote_tx_id: &TxId) -> bool {
        self.transition(blind_vote_tx_id, |status| {
            matches!(status, VoteStatus::Revealed { .. }).then_some(VoteStatus::Tallied)
        })
    }

    fn transition(&mut self, blind_vote_tx_id: &TxId, next: impl FnOnce(VoteStatus) -> Option<VoteStatus>) -> bool {
        let Some(vote) = self
            .votes
            .iter_mut()
            .find(|v| &v.blind_vote_tx_id == blind_vote_tx_id)
        else {
            return false;
        };
        match next(vote.status) {
            Some(status) => {
                vote.status = status;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_only_moves_forward() {
        let id = TxId::new([1; 32]);
        let reveal = TxId::new([2; 32]);
        let mut list = MyVoteList::new();
        assert_eq!(list.status(&id), None);
        list.add(MyVote {
            blind_vote_tx_id: id,
            ballots: BallotList::default(),
            secret_key: SecretKey::from_bytes([3; 32]),
            stake: 10_000,
            status: VoteStatus::Committed,
        });

        assert!(!list.mark_tallied(&id));
        assert!(list.mark_revealed(&id, reveal));
        assert!(!list.mark_revealed(&id, reveal));
        assert_eq!(list.committed().count(), 0);
        assert!(list.mark_tallied(&id));
        assert_eq!(list.status(&id), Some(VoteStatus::Tallied));
        assert!(!list.mark_revealed(&TxId::new([9; 32]), reveal));
    }
}
