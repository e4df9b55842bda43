//! Publishing vote reveals.

use crate::blind_vote::blind_vote_list_digest;
use crate::blind_vote_service::BlindVoteService;
use crate::error::VoteRevealError;
use dao_governance::{SignedTx, WalletService};
use dao_period::DaoView;
use dao_protocol::{encode, OpReturnData};
use dao_types::{Digest, Phase, TxId, TxOutputKey, TxType};
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct VoteRevealService {
    errors: Vec<VoteRevealError>,
}

impl VoteRevealService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reveal every committed vote of the current cycle. Runs after each
    /// appended block; does nothing outside the reveal phase. On its last
    /// block reveals are refused, as the tx could not confirm in time.
    ///
    /// Returns the reveal txs to broadcast. After a reveal, the cycle's
    /// blind votes are queued for republishing.
    pub fn on_new_block<W: WalletService + ?Sized>(
        &mut self,
        view: &DaoView<'_>,
        blind_votes: &mut BlindVoteService,
        wallet: &W,
    ) -> Vec<SignedTx> {
        let height = view.height();
        if !view.period.is_in_phase(height, Phase::VoteReveal) {
            return Vec::new();
        }
        let pending: Vec<TxId> = blind_votes
            .my_votes()
            .committed()
            .map(|v| v.blind_vote_tx_id)
            .filter(|id| is_in_cycle(view, id, height))
            .collect();
        if pending.is_empty() {
            return Vec::new();
        }

        if view.period.is_last_block_in_phase(height, Phase::VoteReveal) {
            for blind_vote_tx_id in pending {
                self.record(VoteRevealError::OutsideRevealWindow {
                    blind_vote_tx_id,
                    height,
                });
            }
            return Vec::new();
        }

        let list_digest = match blind_vote_list_digest(&blind_votes.blind_votes_for_cycle(view, height)) {
            Ok(digest) => digest,
            Err(err) => {
                for blind_vote_tx_id in pending {
                    self.record(VoteRevealError::Encoding {
                        blind_vote_tx_id,
                        message: err.to_string(),
                    });
                }
                return Vec::new();
            }
        };

        let mut txs = Vec::new();
        for blind_vote_tx_id in pending {
            match reveal(view, blind_votes, wallet, blind_vote_tx_id, list_digest) {
                Ok(tx) => {
                    blind_votes
                        .my_votes_mut()
                        .mark_revealed(&blind_vote_tx_id, tx.tx_id);
                    info!(%blind_vote_tx_id, reveal_tx_id = %tx.tx_id, %list_digest, "vote revealed");
                    txs.push(tx);
                }
                Err(err) => self.record(err),
            }
        }
        if !txs.is_empty() {
            let republished = blind_votes.republish_cycle(view, height);
            info!(height, republished, "blind votes republished");
        }
        txs
    }

    /// Reveal failures, oldest first.
    pub fn errors(&self) -> &[VoteRevealError] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<VoteRevealError> {
        std::mem::take(&mut self.errors)
    }

    fn record(&mut self, err: VoteRevealError) {
        warn!(%err, "vote reveal failed");
        self.errors.push(err);
    }
}

fn is_in_cycle(view: &DaoView<'_>, blind_vote_tx_id: &TxId, height: u64) -> bool {
    view.ledger.get_tx(blind_vote_tx_id).is_some_and(|tx| {
        tx.tx_type == TxType::BlindVote
            && view
                .period
                .is_tx_in_phase_and_cycle(tx.block_height, Phase::BlindVote, height)
    })
}

fn reveal<W: WalletService + ?Sized>(
    view: &DaoView<'_>,
    blind_votes: &BlindVoteService,
    wallet: &W,
    blind_vote_tx_id: TxId,
    blind_vote_list_digest: Digest,
) -> Result<SignedTx, VoteRevealError> {
    let stake = TxOutputKey::new(blind_vote_tx_id, 0);
    if !view.ledger.is_unspent(&stake) {
        return Err(VoteRevealError::StakeNotFound { blind_vote_tx_id });
    }
    let my_vote = blind_votes
        .my_votes()
        .get(&blind_vote_tx_id)
        .ok_or(VoteRevealError::StakeNotFound { blind_vote_tx_id })?;
    let op_return = encode(&OpReturnData::VoteReveal {
        secret_key: *my_vote.secret_key.as_bytes(),
        blind_vote_list_digest,
    });
    wallet
        .build_spend_tx(stake, &op_return)
        .map_err(|source| VoteRevealError::Wallet {
            blind_vote_tx_id,
            source,
        })
}
