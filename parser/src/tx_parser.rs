//! Classification of a single transaction.

use crate::raw::RawTx;
use crate::utxo::BlockUtxo;
use dao_ledger::{Ledger, Tx, TxInput, TxOutput};
use dao_period::PeriodEngine;
use dao_protocol::{op_return, OpReturnData};
use dao_types::{Param, Phase, Timestamp, TxOutputKey, TxOutputType, TxType};
use tracing::{debug, warn};

/// Why a transaction with BSQ inputs or a DAO commitment was classified as
/// [`TxType::Invalid`]. All of its BSQ is burned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidReason {
    MalformedOpReturn,
    WrongPhase { expected: Phase, actual: Phase },
    WrongFee { expected: u64, actual: u64 },
    MissingIssuanceCandidate,
    /// A stake or bond output is larger than the BSQ left for it.
    InsufficientBsq,
    StakeSpentWithoutReveal,
    RevealWithoutStake,
    StakeNotFromBlindVotePhase,
    LockupSpentWithOpReturn,
    UnlockValueMismatch { expected: u64, actual: u64 },
    ImmatureUnlock { unlock_height: u64 },
}

/// Output classification in progress.
struct Classified {
    tx_type: TxType,
    types: Vec<TxOutputType>,
    /// Per output: lock time and unlock height for bond outputs.
    bonds: Vec<(Option<u16>, Option<u64>)>,
    /// BSQ not yet assigned to an output; becomes the burnt fee.
    remaining: u64,
    btc_only: bool,
}

impl Classified {
    fn new(outputs: usize, bsq_in: u64) -> Self {
        Self {
            tx_type: TxType::Undefined,
            types: vec![TxOutputType::Undefined; outputs],
            bonds: vec![(None, None); outputs],
            remaining: bsq_in,
            btc_only: false,
        }
    }

    /// Plain output: BSQ while the value fits the remaining BSQ input, BTC
    /// from the first one that does not fit on.
    fn assign(&mut self, index: usize, value: u64) {
        if !self.btc_only && value <= self.remaining {
            self.remaining -= value;
            self.types[index] = TxOutputType::BsqOutput;
        } else {
            self.btc_only = true;
            self.types[index] = TxOutputType::BtcOutput;
        }
    }

    /// Output that must be funded entirely by BSQ.
    fn take(&mut self, index: usize, value: u64, ty: TxOutputType) -> Result<(), InvalidReason> {
        if value > self.remaining {
            return Err(InvalidReason::InsufficientBsq);
        }
        self.remaining -= value;
        self.types[index] = ty;
        Ok(())
    }

    fn assign_rest(&mut self, raw: &RawTx, from: usize, end: usize) {
        for i in from..end {
            self.assign(i, raw.outputs[i].value);
        }
    }
}

/// Classifies transactions of the block at `height`.
pub(crate) struct TxParser<'a> {
    ledger: &'a Ledger,
    period: &'a PeriodEngine,
    height: u64,
    time: Timestamp,
}

impl<'a> TxParser<'a> {
    pub(crate) fn new(ledger: &'a Ledger, period: &'a PeriodEngine, height: u64, time: Timestamp) -> Self {
        Self {
            ledger,
            period,
            height,
            time,
        }
    }

    /// `None` if the transaction neither spends BSQ nor carries a DAO
    /// commitment.
    pub(crate) fn parse(&self, raw: &RawTx, utxo: &BlockUtxo<'_>) -> Option<Tx> {
        let connected: Vec<Option<&TxOutput>> = raw.inputs.iter().map(|i| utxo.get(&i.key())).collect();
        let bsq_in: u64 = connected.iter().flatten().map(|o| o.value).sum();
        let op_return = raw
            .op_return_data()
            .filter(|bytes| op_return::peek_type(bytes).is_some())
            .map(op_return::decode);

        if connected.iter().all(Option::is_none) && op_return.is_none() {
            return None;
        }

        let mut c = Classified::new(raw.outputs.len(), bsq_in);
        let result = match op_return {
            Some(Ok(data)) => self.classify_dao_tx(raw, &connected, &data, &mut c),
            Some(Err(err)) => {
                debug!(tx_id = %raw.id, %err, "malformed DAO OP_RETURN");
                Err(InvalidReason::MalformedOpReturn)
            }
            None => self.classify_transfer(raw, &connected, &mut c),
        };

        Some(match result {
            Ok(()) => self.build(raw, c.tx_type, &c.types, &c.bonds, c.remaining),
            Err(reason) => {
                warn!(tx_id = %raw.id, height = self.height, ?reason, "invalid BSQ tx; inputs burned");
                let types = vec![TxOutputType::InvalidOutput; raw.outputs.len()];
                let bonds = vec![(None, None); raw.outputs.len()];
                self.build(raw, TxType::Invalid, &types, &bonds, bsq_in)
            }
        })
    }

    fn check_immature_unlocks(&self, connected: &[Option<&TxOutput>]) -> Result<(), InvalidReason> {
        for output in connected.iter().flatten() {
            if output.output_type == TxOutputType::UnlockOutput {
                let unlock_height = output.unlock_block_height.unwrap_or(0);
                if unlock_height > self.height {
                    return Err(InvalidReason::ImmatureUnlock { unlock_height });
                }
            }
        }
        Ok(())
    }

    fn check_phase(&self, expected: Phase) -> Result<(), InvalidReason> {
        let actual = self.period.phase_for_height(self.height);
        if actual != expected {
            return Err(InvalidReason::WrongPhase { expected, actual });
        }
        Ok(())
    }

    fn check_fee(&self, param: Param, burnt: u64) -> Result<(), InvalidReason> {
        let expected = self.ledger.param_value(param, self.height);
        if burnt != expected {
            return Err(InvalidReason::WrongFee {
                expected,
                actual: burnt,
            });
        }
        Ok(())
    }

    /// Transactions without a DAO commitment: transfers, trade-fee payments
    /// and bond unlocks.
    fn classify_transfer(
        &self,
        raw: &RawTx,
        connected: &[Option<&TxOutput>],
        c: &mut Classified,
    ) -> Result<(), InvalidReason> {
        self.check_immature_unlocks(connected)?;
        let spent = || connected.iter().flatten();
        if spent().any(|o| o.output_type == TxOutputType::BlindVoteLockStakeOutput) {
            return Err(InvalidReason::StakeSpentWithoutReveal);
        }

        let n = raw.outputs.len();
        if let Some(lockup) = spent().find(|o| o.output_type == TxOutputType::LockupOutput) {
            let first = raw.outputs.first().map_or(0, |o| o.value);
            if n == 0 || first != lockup.value {
                return Err(InvalidReason::UnlockValueMismatch {
                    expected: lockup.value,
                    actual: first,
                });
            }
            c.take(0, first, TxOutputType::UnlockOutput)?;
            let lock_time = lockup.lock_time.unwrap_or(0);
            c.bonds[0] = (Some(lock_time), Some(self.height + u64::from(lock_time)));
            c.assign_rest(raw, 1, n);
            c.tx_type = TxType::Unlock;
            return Ok(());
        }

        c.assign_rest(raw, 0, n);
        c.tx_type = if c.remaining > 0 {
            TxType::PayTradeFee
        } else {
            TxType::TransferBsq
        };
        Ok(())
    }

    fn classify_dao_tx(
        &self,
        raw: &RawTx,
        connected: &[Option<&TxOutput>],
        data: &OpReturnData,
        c: &mut Classified,
    ) -> Result<(), InvalidReason> {
        self.check_immature_unlocks(connected)?;
        let spent = || connected.iter().flatten();
        if spent().any(|o| o.output_type == TxOutputType::LockupOutput) {
            return Err(InvalidReason::LockupSpentWithOpReturn);
        }
        let is_reveal = matches!(data, OpReturnData::VoteReveal { .. });
        if !is_reveal && spent().any(|o| o.output_type == TxOutputType::BlindVoteLockStakeOutput) {
            return Err(InvalidReason::StakeSpentWithoutReveal);
        }

        // The commitment is always the last output.
        let op_index = raw.outputs.len() - 1;
        match data {
            OpReturnData::Proposal(_) => {
                self.check_phase(Phase::Proposal)?;
                c.assign_rest(raw, 0, op_index);
                self.check_fee(Param::ProposalFee, c.remaining)?;
                c.tx_type = TxType::Proposal;
                c.types[op_index] = TxOutputType::ProposalOpReturn;
            }
            OpReturnData::CompensationRequest(_) | OpReturnData::ReimbursementRequest(_) => {
                self.check_phase(Phase::Proposal)?;
                // change (BSQ or BTC), issuance candidate, .., commitment
                if op_index < 2 {
                    return Err(InvalidReason::MissingIssuanceCandidate);
                }
                c.assign(0, raw.outputs[0].value);
                c.types[1] = TxOutputType::IssuanceCandidateOutput;
                c.btc_only = true;
                c.assign_rest(raw, 2, op_index);
                self.check_fee(Param::ProposalFee, c.remaining)?;
                if matches!(data, OpReturnData::CompensationRequest(_)) {
                    c.tx_type = TxType::CompensationRequest;
                    c.types[op_index] = TxOutputType::CompReqOpReturn;
                } else {
                    c.tx_type = TxType::ReimbursementRequest;
                    c.types[op_index] = TxOutputType::ReimbursementOpReturn;
                }
            }
            OpReturnData::BlindVote(_) => {
                self.check_phase(Phase::BlindVote)?;
                if op_index < 1 {
                    return Err(InvalidReason::InsufficientBsq);
                }
                c.take(0, raw.outputs[0].value, TxOutputType::BlindVoteLockStakeOutput)?;
                c.assign_rest(raw, 1, op_index);
                self.check_fee(Param::BlindVoteFee, c.remaining)?;
                c.tx_type = TxType::BlindVote;
                c.types[op_index] = TxOutputType::BlindVoteOpReturn;
            }
            OpReturnData::VoteReveal { .. } => {
                self.check_phase(Phase::VoteReveal)?;
                let stake = connected
                    .first()
                    .copied()
                    .flatten()
                    .filter(|o| o.output_type == TxOutputType::BlindVoteLockStakeOutput)
                    .ok_or(InvalidReason::RevealWithoutStake)?;
                if !self
                    .period
                    .is_tx_in_phase_and_cycle(stake.block_height, Phase::BlindVote, self.height)
                {
                    return Err(InvalidReason::StakeNotFromBlindVotePhase);
                }
                if op_index < 1 {
                    return Err(InvalidReason::InsufficientBsq);
                }
                c.take(0, raw.outputs[0].value, TxOutputType::VoteRevealUnlockStakeOutput)?;
                c.assign_rest(raw, 1, op_index);
                c.tx_type = TxType::VoteReveal;
                c.types[op_index] = TxOutputType::VoteRevealOpReturn;
            }
            OpReturnData::Lockup { lock_time, .. } => {
                if op_index < 1 {
                    return Err(InvalidReason::InsufficientBsq);
                }
                c.take(0, raw.outputs[0].value, TxOutputType::LockupOutput)?;
                c.bonds[0] = (Some(*lock_time), None);
                c.assign_rest(raw, 1, op_index);
                c.tx_type = TxType::Lockup;
                c.types[op_index] = TxOutputType::LockupOpReturn;
            }
        }
        Ok(())
    }

    fn build(
        &self,
        raw: &RawTx,
        tx_type: TxType,
        types: &[TxOutputType],
        bonds: &[(Option<u16>, Option<u64>)],
        burnt_fee: u64,
    ) -> Tx {
        let outputs = raw
            .outputs
            .iter()
            .zip(types.iter().zip(bonds))
            .map(|(out, (ty, (lock_time, unlock_height)))| TxOutput {
                key: TxOutputKey::new(raw.id, out.index),
                value: out.value,
                address: out.address.clone(),
                op_return_data: out.op_return_data.clone(),
                block_height: self.height,
                output_type: *ty,
                lock_time: *lock_time,
                unlock_block_height: *unlock_height,
            })
            .collect();
        Tx {
            id: raw.id,
            block_height: self.height,
            time: self.time,
            inputs: raw
                .inputs
                .iter()
                .map(|i| TxInput { connected: i.key() })
                .collect(),
            outputs,
            tx_type,
            burnt_fee,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_switches_to_btc_for_good() {
        let mut c = Classified::new(3, 100);
        c.assign(0, 60);
        c.assign(1, 50);
        c.assign(2, 10);
        assert_eq!(
            c.types,
            vec![TxOutputType::BsqOutput, TxOutputType::BtcOutput, TxOutputType::BtcOutput]
        );
        assert_eq!(c.remaining, 40);
    }

    #[test]
    fn take_requires_enough_bsq() {
        let mut c = Classified::new(1, 10);
        assert_eq!(
            c.take(0, 11, TxOutputType::LockupOutput),
            Err(InvalidReason::InsufficientBsq)
        );
        assert!(c.take(0, 10, TxOutputType::LockupOutput).is_ok());
        assert_eq!(c.remaining, 0);
    }
}
