use crate::blind_vote::{commitment_digest, BlindVote, BlindVotePayload};
use crate::error::BlindVoteValidationError;
use dao_period::DaoView;
use dao_protocol::{op_return, OpReturnData};
use dao_types::{Param, Phase, TxType};

#[derive(Clone, Copy, Debug, Default)]
pub struct BlindVoteValidator;

impl BlindVoteValidator {
    pub fn new() -> Self {
        Self
    }

    /// Checks that need no chain data. Enough to admit a payload into the
    /// durable record.
    pub fn validate_structure(&self, payload: &BlindVotePayload) -> Result<(), BlindVoteValidationError> {
        let vote = &payload.blind_vote;
        if vote.encrypted_votes.is_empty() {
            return Err(BlindVoteValidationError::EmptyVotes);
        }
        if vote.stake == 0 {
            return Err(BlindVoteValidationError::ZeroStake);
        }
        if !payload.verify()? {
            return Err(BlindVoteValidationError::InvalidSignature);
        }
        Ok(())
    }

    /// Whether `vote` counts for the cycle containing `cycle_height`.
    pub fn validate_confirmed(
        &self,
        vote: &BlindVote,
        view: &DaoView<'_>,
        cycle_height: u64,
    ) -> Result<(), BlindVoteValidationError> {
        let tx_id = vote.tx_id;
        let tx = view
            .ledger
            .get_tx(&tx_id)
            .ok_or(BlindVoteValidationError::TxNotFound(tx_id))?;
        if tx.tx_type != TxType::BlindVote {
            return Err(BlindVoteValidationError::NotABlindVoteTx(tx_id));
        }
        if !view
            .period
            .is_tx_in_phase_and_cycle(tx.block_height, Phase::BlindVote, cycle_height)
        {
            return Err(BlindVoteValidationError::WrongCycle {
                tx_id,
                height: tx.block_height,
            });
        }

        let committed = tx
            .op_return_data()
            .and_then(|bytes| op_return::decode(bytes).ok());
        if committed != Some(OpReturnData::BlindVote(commitment_digest(&vote.encrypted_votes))) {
            return Err(BlindVoteValidationError::CommitmentMismatch(tx_id));
        }

        let locked = tx.output(0).map_or(0, |o| o.value);
        if locked != vote.stake {
            return Err(BlindVoteValidationError::StakeMismatch {
                tx_id,
                claimed: vote.stake,
                locked,
            });
        }

        let expected = view.ledger.param_value(Param::BlindVoteFee, tx.block_height);
        if tx.burnt_fee != expected {
            return Err(BlindVoteValidationError::WrongFee {
                tx_id,
                expected,
                actual: tx.burnt_fee,
            });
        }
        Ok(())
    }
}
