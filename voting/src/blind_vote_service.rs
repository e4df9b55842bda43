//! Creating blind votes and keeping the local record of everyone's.

use crate::blind_vote::{
    commitment_digest, encrypt_votes, votes_from_ballots, BlindVote, BlindVotePayload,
};
use crate::error::VotingError;
use crate::my_votes::{MyVote, MyVoteList, VoteStatus};
use crate::validation::BlindVoteValidator;
use dao_crypto::SecretKey;
use dao_governance::{AppendOnlyStore, BallotList, SignedTx, WalletService};
use dao_ledger::{Block, StateChangeEvent};
use dao_period::{DaoView, StateChangeProvider};
use dao_protocol::{encode, OpReturnData};
use dao_types::{KeyPair, Param, Phase, Timestamp, TxId};
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
pub struct BlindVoteService {
    validator: BlindVoteValidator,
    /// Durable record of every structurally valid blind vote seen.
    store: AppendOnlyStore<BlindVotePayload>,
    my_votes: MyVoteList,
    /// Payloads to hand to the network layer.
    published: Vec<BlindVotePayload>,
}

impl BlindVoteService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encrypt `ballots` under a fresh key, have the wallet lock `stake`
    /// with the commitment, and record the vote locally. The returned tx is
    /// not broadcast yet.
    pub fn publish_blind_vote<W: WalletService + ?Sized>(
        &mut self,
        wallet: &W,
        keys: &KeyPair,
        ballots: BallotList,
        stake: u64,
        view: &DaoView<'_>,
    ) -> Result<(BlindVotePayload, SignedTx), VotingError> {
        let phase = view.phase();
        if phase != Phase::BlindVote {
            return Err(VotingError::NotInBlindVotePhase(phase));
        }
        if ballots.is_empty() {
            return Err(VotingError::NoBallots);
        }
        if stake == 0 {
            return Err(VotingError::ZeroStake);
        }

        let secret_key = SecretKey::generate();
        let encrypted_votes = encrypt_votes(&votes_from_ballots(&ballots), &secret_key)?;
        let commitment = commitment_digest(&encrypted_votes);
        let op_return = encode(&OpReturnData::BlindVote(commitment));
        let fee = view.param(Param::BlindVoteFee);
        let tx = wallet.build_stake_tx(stake, fee, &op_return)?;

        let blind_vote = BlindVote {
            tx_id: tx.tx_id,
            encrypted_votes,
            stake,
            owner: keys.public.clone(),
            created_at: Timestamp::now(),
        };
        let payload = BlindVotePayload::sign(blind_vote, &keys.private)?;
        self.store.add(payload.clone())?;
        self.my_votes.add(MyVote {
            blind_vote_tx_id: tx.tx_id,
            ballots,
            secret_key,
            stake,
            status: VoteStatus::Committed,
        });
        self.published.push(payload.clone());
        info!(tx_id = %tx.tx_id, stake, fee, %commitment, "blind vote created");
        Ok((payload, tx))
    }

    /// A blind vote from the network. Chain checks happen when the vote is
    /// used, since its tx may confirm later than the payload arrives.
    pub fn on_blind_vote_received(&mut self, payload: BlindVotePayload) -> Result<bool, VotingError> {
        if let Err(err) = self.validator.validate_structure(&payload) {
            warn!(tx_id = %payload.blind_vote.tx_id, %err, "blind vote rejected");
            return Err(err.into());
        }
        let tx_id = payload.blind_vote.tx_id;
        let (_, is_new) = self.store.add(payload)?;
        if is_new {
            debug!(%tx_id, "blind vote stored");
        }
        Ok(is_new)
    }

    pub fn find(&self, tx_id: &TxId) -> Option<&BlindVote> {
        self.store
            .values()
            .map(|p| &p.blind_vote)
            .find(|b| &b.tx_id == tx_id)
    }

    pub fn payloads(&self) -> impl Iterator<Item = &BlindVotePayload> {
        self.store.values()
    }

    /// Blind votes valid for the cycle containing `height`, sorted by tx id.
    ///
    /// The store may hold several signed copies of one tx. Every copy that
    /// passes the chain checks has the same [`key`](BlindVote::key), so the
    /// first valid one stands for all of them.
    pub fn blind_votes_for_cycle(&self, view: &DaoView<'_>, height: u64) -> Vec<&BlindVote> {
        let mut votes: Vec<&BlindVote> = Vec::new();
        for vote in self.store.values().map(|p| &p.blind_vote) {
            if votes.iter().any(|v| v.tx_id == vote.tx_id) {
                continue;
            }
            if self.validator.validate_confirmed(vote, view, height).is_ok() {
                votes.push(vote);
            }
        }
        votes.sort_by_key(|v| v.tx_id);
        votes
    }

    pub fn my_votes(&self) -> &MyVoteList {
        &self.my_votes
    }

    pub(crate) fn my_votes_mut(&mut self) -> &mut MyVoteList {
        &mut self.my_votes
    }

    /// Queue every payload of the cycle containing `height` for publishing
    /// to the append-only network store.
    pub fn republish_cycle(&mut self, view: &DaoView<'_>, height: u64) -> usize {
        let ids: Vec<TxId> = self
            .blind_votes_for_cycle(view, height)
            .iter()
            .map(|b| b.tx_id)
            .collect();
        let payloads: Vec<BlindVotePayload> = self
            .store
            .values()
            .filter(|p| ids.contains(&p.blind_vote.tx_id))
            .cloned()
            .collect();
        let count = payloads.len();
        self.published.extend(payloads);
        count
    }

    /// Drain payloads queued for publishing.
    pub fn take_published(&mut self) -> Vec<BlindVotePayload> {
        std::mem::take(&mut self.published)
    }
}

impl StateChangeProvider for BlindVoteService {
    /// Report the cycle's blind votes once the blind-vote phase closes.
    fn on_block(&mut self, view: &DaoView<'_>, block: &Block) -> Vec<StateChangeEvent> {
        if !view.period.is_last_block_in_phase(block.height, Phase::BlindVote) {
            return Vec::new();
        }
        let events: Vec<StateChangeEvent> = self
            .blind_votes_for_cycle(view, block.height)
            .into_iter()
            .map(|b| StateChangeEvent::BlindVoteConfirmed {
                tx_id: b.tx_id,
                commitment: commitment_digest(&b.encrypted_votes),
                stake: b.stake,
            })
            .collect();
        info!(height = block.height, blind_votes = events.len(), "blind-vote phase closed");
        events
    }
}
