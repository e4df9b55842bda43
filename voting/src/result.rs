//! The vote result: run once per cycle at the first block of the result
//! phase, turning revealed votes into accepted or rejected proposals and
//! their state changes.

use crate::blind_vote::{decrypt_votes, BlindVote};
use crate::blind_vote_service::BlindVoteService;
use crate::error::VoteResultError;
use crate::tally::{evaluate_outcome, find_matching_sublist, majority_digest, EvaluatedProposal};
use dao_crypto::SecretKey;
use dao_governance::{ProposalKind, ProposalService, Vote};
use dao_ledger::{Block, IssuanceKind, StateChangeEvent};
use dao_period::DaoView;
use dao_protocol::{op_return, OpReturnData};
use dao_types::{Digest, Param, Phase, TxId, TxOutputKey, TxType};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// A reveal confirmed in the current cycle.
#[derive(Clone, Debug)]
pub struct RevealedVote {
    pub blind_vote_tx_id: TxId,
    pub reveal_tx_id: TxId,
    pub stake: u64,
    /// The revealer's view of the cycle's blind-vote list.
    pub list_digest: Digest,
    secret_key: SecretKey,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CycleResult {
    pub cycle_index: usize,
    pub height: u64,
    pub majority_digest: Option<Digest>,
    /// Blind votes whose ballots were counted.
    pub counted_blind_votes: Vec<TxId>,
    /// Revealed blind votes left out because their payload was not held
    /// locally. Recovery is requested for them.
    pub excluded_reveals: Vec<TxId>,
    pub evaluated: Vec<EvaluatedProposal>,
}

impl CycleResult {
    pub fn accepted(&self) -> impl Iterator<Item = &EvaluatedProposal> {
        self.evaluated.iter().filter(|e| e.is_accepted())
    }
}

/// Blind votes the local node lacks relative to what was revealed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecoveryRequest {
    pub cycle_index: usize,
    pub height: u64,
    pub majority_digest: Option<Digest>,
    pub missing_blind_votes: Vec<TxId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VoteResultOutcome {
    Completed(CycleResult),
    /// No binding tally until the missing data is recovered.
    Deferred {
        request: RecoveryRequest,
        error: VoteResultError,
    },
}

#[derive(Debug, Default)]
pub struct VoteResultService {
    outcomes: Vec<VoteResultOutcome>,
    recovery_requests: Vec<RecoveryRequest>,
}

impl VoteResultService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tally the cycle if `block` is the first block of its result phase.
    /// Returns the state changes of accepted proposals.
    pub fn on_block(
        &mut self,
        view: &DaoView<'_>,
        block: &Block,
        proposals: &ProposalService,
        blind_votes: &mut BlindVoteService,
    ) -> Vec<StateChangeEvent> {
        let height = block.height;
        if !view.period.is_first_block_in_phase(height, Phase::VoteResult) {
            return Vec::new();
        }
        let cycle_index = view.period.cycle_index_for_height(height).unwrap_or_default();
        let local = blind_votes.blind_votes_for_cycle(view, height);
        // a reveal whose blind vote is not held locally sits out this pass
        let (reveals, excluded): (Vec<RevealedVote>, Vec<RevealedVote>) = collect_reveals(view, height)
            .into_iter()
            .partition(|r| local.iter().any(|b| b.tx_id == r.blind_vote_tx_id));
        let excluded: Vec<TxId> = excluded.into_iter().map(|r| r.blind_vote_tx_id).collect();
        let majority = majority_digest(reveals.iter().map(|r| (r.list_digest, r.stake)));

        let tallied = match majority {
            None => local.clone(),
            Some(target) => match find_matching_sublist(&local, &target) {
                Ok(Some(list)) => list,
                Ok(None) => {
                    let mut missing = excluded;
                    for id in unknown_blind_vote_txs(view, height, &local) {
                        if !missing.contains(&id) {
                            missing.push(id);
                        }
                    }
                    warn!(cycle_index, majority = %target, local = local.len(), missing = missing.len(), "blind-vote list differs from majority; tally deferred");
                    let request = RecoveryRequest {
                        cycle_index,
                        height,
                        majority_digest: majority,
                        missing_blind_votes: missing,
                    };
                    self.defer(request, VoteResultError::MajorityMismatch { majority: target });
                    return Vec::new();
                }
                Err(err) => {
                    let request = RecoveryRequest {
                        cycle_index,
                        height,
                        majority_digest: majority,
                        missing_blind_votes: excluded,
                    };
                    self.defer(request, err.into());
                    return Vec::new();
                }
            },
        };
        if !excluded.is_empty() {
            info!(cycle_index, excluded = excluded.len(), "revealed blind votes missing locally; left out of the tally");
            self.recovery_requests.push(RecoveryRequest {
                cycle_index,
                height,
                majority_digest: majority,
                missing_blind_votes: excluded.clone(),
            });
        }

        let (stakes, counted) = count_votes(&reveals, &tallied);
        let evaluated: Vec<EvaluatedProposal> = proposals
            .confirmed_for_cycle(view, height)
            .into_iter()
            .map(|proposal| {
                let (accepted, rejected) = proposal
                    .tx_id
                    .and_then(|id| stakes.get(&id).copied())
                    .unwrap_or_default();
                let outcome = evaluate_outcome(
                    accepted,
                    rejected,
                    view.param(proposal.kind.quorum_param()),
                    view.param(proposal.kind.threshold_param()),
                );
                debug!(uid = %proposal.uid, accepted, rejected, ?outcome, "proposal evaluated");
                EvaluatedProposal {
                    proposal: proposal.clone(),
                    accepted_stake: accepted,
                    rejected_stake: rejected,
                    outcome,
                }
            })
            .collect();

        let events = state_changes(view, height, &evaluated);
        for id in &counted {
            blind_votes.my_votes_mut().mark_tallied(id);
        }
        info!(
            cycle_index,
            height,
            reveals = reveals.len(),
            counted = counted.len(),
            proposals = evaluated.len(),
            accepted = evaluated.iter().filter(|e| e.is_accepted()).count(),
            events = events.len(),
            "vote result completed"
        );
        self.outcomes.push(VoteResultOutcome::Completed(CycleResult {
            cycle_index,
            height,
            majority_digest: majority,
            counted_blind_votes: counted,
            excluded_reveals: excluded,
            evaluated,
        }));
        events
    }

    pub fn outcomes(&self) -> &[VoteResultOutcome] {
        &self.outcomes
    }

    pub fn last_outcome(&self) -> Option<&VoteResultOutcome> {
        self.outcomes.last()
    }

    /// Drain pending recovery requests for the network layer.
    pub fn take_recovery_requests(&mut self) -> Vec<RecoveryRequest> {
        std::mem::take(&mut self.recovery_requests)
    }

    /// Drop outcomes recorded at or above `height`, when the chain above it
    /// is re-derived.
    pub fn truncate(&mut self, height: u64) {
        self.outcomes.retain(|o| match o {
            VoteResultOutcome::Completed(r) => r.height < height,
            VoteResultOutcome::Deferred { request, .. } => request.height < height,
        });
    }

    fn defer(&mut self, request: RecoveryRequest, error: VoteResultError) {
        self.recovery_requests.push(request.clone());
        self.outcomes.push(VoteResultOutcome::Deferred { request, error });
    }
}

/// Reveal txs confirmed in the reveal phase of the cycle containing
/// `height`, in block order.
pub fn collect_reveals(view: &DaoView<'_>, height: u64) -> Vec<RevealedVote> {
    let (Some(first), Some(last)) = (
        view.period.first_block_of_phase(height, Phase::VoteReveal),
        view.period.last_block_of_phase(height, Phase::VoteReveal),
    ) else {
        return Vec::new();
    };
    view.ledger
        .blocks_from(first)
        .iter()
        .take_while(|b| b.height <= last)
        .flat_map(|b| b.txs.iter())
        .filter(|tx| tx.tx_type == TxType::VoteReveal)
        .filter_map(|tx| {
            let Ok(OpReturnData::VoteReveal {
                secret_key,
                blind_vote_list_digest,
            }) = op_return::decode(tx.op_return_data()?)
            else {
                return None;
            };
            let blind_vote_tx_id = tx.inputs.first()?.connected.tx_id;
            let stake = view.ledger.get_tx(&blind_vote_tx_id)?.output(0)?.value;
            Some(RevealedVote {
                blind_vote_tx_id,
                reveal_tx_id: tx.id,
                stake,
                list_digest: blind_vote_list_digest,
                secret_key: SecretKey::from_bytes(secret_key),
            })
        })
        .collect()
}

/// Blind-vote txs confirmed in the blind-vote phase of the cycle containing
/// `height` that have no counterpart in `local`.
fn unknown_blind_vote_txs(view: &DaoView<'_>, height: u64, local: &[&BlindVote]) -> Vec<TxId> {
    let (Some(first), Some(last)) = (
        view.period.first_block_of_phase(height, Phase::BlindVote),
        view.period.last_block_of_phase(height, Phase::BlindVote),
    ) else {
        return Vec::new();
    };
    view.ledger
        .blocks_from(first)
        .iter()
        .take_while(|b| b.height <= last)
        .flat_map(|b| b.txs.iter())
        .filter(|tx| tx.tx_type == TxType::BlindVote)
        .map(|tx| tx.id)
        .filter(|id| !local.iter().any(|b| &b.tx_id == id))
        .collect()
}

/// Accepted and rejected stake per proposal tx id, and the blind votes that
/// contributed.
fn count_votes(reveals: &[RevealedVote], tallied: &[&BlindVote]) -> (BTreeMap<TxId, (u64, u64)>, Vec<TxId>) {
    let mut stakes: BTreeMap<TxId, (u64, u64)> = BTreeMap::new();
    let mut counted = Vec::new();
    for reveal in reveals {
        let Some(blind_vote) = tallied.iter().find(|b| b.tx_id == reveal.blind_vote_tx_id) else {
            debug!(blind_vote_tx_id = %reveal.blind_vote_tx_id, "reveal outside the majority list ignored");
            continue;
        };
        let votes = match decrypt_votes(&blind_vote.encrypted_votes, &reveal.secret_key) {
            Ok(votes) => votes,
            Err(err) => {
                warn!(blind_vote_tx_id = %reveal.blind_vote_tx_id, %err, "revealed key does not open the ballots");
                continue;
            }
        };
        // one vote per proposal and voter
        let mut ballot: BTreeMap<TxId, Vote> = BTreeMap::new();
        for v in votes {
            if let Some(vote) = v.vote {
                ballot.entry(v.proposal_tx_id).or_insert(vote);
            }
        }
        for (proposal_tx_id, vote) in ballot {
            let (accepted, rejected) = stakes.entry(proposal_tx_id).or_default();
            let bucket = if vote.accepted { accepted } else { rejected };
            *bucket = bucket.saturating_add(reveal.stake);
        }
        counted.push(reveal.blind_vote_tx_id);
    }
    (stakes, counted)
}

/// State changes of the accepted proposals, recorded at `height`.
fn state_changes(view: &DaoView<'_>, height: u64, evaluated: &[EvaluatedProposal]) -> Vec<StateChangeEvent> {
    let activation_height = view
        .period
        .cycle_for_height(height)
        .map_or(height + 1, |c| c.height_of_last_block() + 1);
    let mut events = Vec::new();
    // param -> (stake, proposal tx id, value)
    let mut param_winners: BTreeMap<Param, (u64, TxId, u64)> = BTreeMap::new();

    for e in evaluated.iter().filter(|e| e.is_accepted()) {
        let Some(tx_id) = e.proposal.tx_id else {
            continue;
        };
        match &e.proposal.kind {
            ProposalKind::CompensationRequest { requested } | ProposalKind::ReimbursementRequest { requested } => {
                let candidate = view
                    .ledger
                    .get_tx_output(&TxOutputKey::new(tx_id, 1))
                    .map(|o| o.value);
                if candidate != Some(*requested) {
                    warn!(%tx_id, requested, ?candidate, "issuance candidate does not match request");
                    continue;
                }
                let kind = if matches!(e.proposal.kind, ProposalKind::CompensationRequest { .. }) {
                    IssuanceKind::Compensation
                } else {
                    IssuanceKind::Reimbursement
                };
                events.push(StateChangeEvent::Issuance {
                    tx_id,
                    amount: *requested,
                    kind,
                });
            }
            ProposalKind::ChangeParam { param, value } => {
                let wins = param_winners.get(param).map_or(true, |(stake, id, _)| {
                    e.accepted_stake > *stake || (e.accepted_stake == *stake && tx_id < *id)
                });
                if wins {
                    param_winners.insert(*param, (e.accepted_stake, tx_id, *value));
                }
            }
            ProposalKind::BondedRole { role, bond_units } => {
                events.push(StateChangeEvent::BondedRoleAccepted {
                    proposal_tx_id: tx_id,
                    role: role.clone(),
                    required_bond: bond_units.saturating_mul(view.param(Param::BondedRoleFactor)),
                });
            }
            ProposalKind::ConfiscateBond { lockup_tx_id } => {
                if !view.ledger.state().is_confiscated(lockup_tx_id) {
                    events.push(StateChangeEvent::BondConfiscated {
                        lockup_tx_id: *lockup_tx_id,
                    });
                }
            }
            ProposalKind::RemoveAsset { ticker } => {
                events.push(StateChangeEvent::AssetRemoved { ticker: ticker.clone() });
            }
            ProposalKind::Generic => {}
        }
    }

    for (param, (_, _, value)) in param_winners {
        events.push(StateChangeEvent::ParamChange {
            param,
            value,
            recorded_height: height,
            activation_height,
        });
    }
    events
}
