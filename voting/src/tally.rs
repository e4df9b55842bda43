//! Consensus arithmetic of the vote result: majority selection, list
//! reconciliation and per-proposal outcomes.

use crate::blind_vote::{key_list_digest, BlindVote, BlindVoteKey};
use dao_governance::Proposal;
use dao_types::Digest;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

/// Fixed-point scale of acceptance ratios and thresholds (basis points).
pub const RATIO_SCALE: u64 = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalOutcome {
    Accepted,
    QuorumNotReached,
    ThresholdNotReached,
}

/// Accepted stake over total stake, in basis points, rounded down.
pub fn acceptance_ratio(accepted: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    let ratio = u128::from(accepted) * u128::from(RATIO_SCALE) / u128::from(total);
    u64::try_from(ratio).unwrap_or(u64::MAX)
}

/// Total stake must reach `quorum`; the acceptance ratio must strictly
/// exceed `threshold`.
pub fn evaluate_outcome(accepted: u64, rejected: u64, quorum: u64, threshold: u64) -> ProposalOutcome {
    let total = accepted.saturating_add(rejected);
    if total < quorum || total == 0 {
        return ProposalOutcome::QuorumNotReached;
    }
    if acceptance_ratio(accepted, total) > threshold {
        ProposalOutcome::Accepted
    } else {
        ProposalOutcome::ThresholdNotReached
    }
}

/// The digest with the most stake behind it. Ties go to the smaller digest.
pub fn majority_digest(attestations: impl IntoIterator<Item = (Digest, u64)>) -> Option<Digest> {
    let mut stakes: BTreeMap<Digest, u64> = BTreeMap::new();
    for (digest, stake) in attestations {
        let sum = stakes.entry(digest).or_default();
        *sum = sum.saturating_add(stake);
    }
    stakes
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        .map(|(digest, _)| digest)
}

/// Find a sub-list of `local` whose digest equals `target`.
///
/// Tried in order: the whole list, each single removal, then dropping a
/// growing prefix and a growing suffix. Candidates are built one at a time
/// from the chain-bound keys and the search stops at the first match. Best
/// effort: `None` means the local view is missing data and must be recovered
/// from peers.
pub fn find_matching_sublist<'a>(
    local: &[&'a BlindVote],
    target: &Digest,
) -> Result<Option<Vec<&'a BlindVote>>, bincode::Error> {
    let mut sorted = local.to_vec();
    sorted.sort_by_key(|b| b.tx_id);
    sorted.dedup_by_key(|b| b.tx_id);
    let keys: Vec<BlindVoteKey> = sorted.iter().map(|b| b.key()).collect();
    let n = keys.len();

    // (skipped index, kept range)
    let candidates = std::iter::once((None, 0..n))
        .chain((0..n).map(|skip| (Some(skip), 0..n)))
        .chain((2..n).flat_map(|k| [(None, k..n), (None, 0..n - k)]));
    let mut tried = 0usize;
    for (skip, range) in candidates {
        tried += 1;
        let picked = || range.clone().filter(move |i| Some(*i) != skip);
        let candidate: Vec<BlindVoteKey> = picked().map(|i| keys[i]).collect();
        if key_list_digest(&candidate)? == *target {
            trace!(tried, kept = candidate.len(), "matching blind-vote sub-list found");
            return Ok(Some(picked().map(|i| sorted[i]).collect()));
        }
    }
    trace!(tried, "no blind-vote sub-list matches");
    Ok(None)
}

/// A proposal with the stake cast on it and the resulting outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluatedProposal {
    pub proposal: Proposal,
    pub accepted_stake: u64,
    pub rejected_stake: u64,
    pub outcome: ProposalOutcome,
}

impl EvaluatedProposal {
    pub fn is_accepted(&self) -> bool {
        self.outcome == ProposalOutcome::Accepted
    }
}
