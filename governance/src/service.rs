//! Preliminary and confirmed proposal lists.

use crate::error::{GovernanceError, ValidationError};
use crate::proposal::{Proposal, ProposalPayload};
use crate::store::{AppendOnlyStore, HashMapStore};
use crate::validation::ProposalValidator;
use dao_ledger::{Block, StateChangeEvent};
use dao_period::{DaoView, StateChangeProvider};
use dao_types::{Digest, Phase};
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
pub struct ProposalService {
    validator: ProposalValidator,
    /// Removable until the blind-vote phase starts.
    preliminary: HashMapStore<ProposalPayload>,
    confirmed: AppendOnlyStore<ProposalPayload>,
    /// Confirmed payloads not yet handed to the network layer.
    republished: Vec<ProposalPayload>,
}

impl ProposalService {
    pub fn new() -> Self {
        Self::default()
    }

    /// A proposal from the mutable network store. Returns whether it was new.
    pub fn on_proposal_received(
        &mut self,
        payload: ProposalPayload,
        view: &DaoView<'_>,
    ) -> Result<bool, GovernanceError> {
        if let Err(err) = self.validator.validate_payload(&payload, view) {
            warn!(uid = %payload.proposal.uid, %err, "proposal rejected");
            return Err(err.into());
        }
        let uid = payload.proposal.uid.clone();
        let (hash, is_new) = self.preliminary.add(payload)?;
        if is_new {
            info!(%uid, %hash, "preliminary proposal added");
        }
        Ok(is_new)
    }

    /// A proposal from the append-only network store, published by a peer
    /// at the start of a blind-vote phase. Accepted when the signature holds
    /// and its fee tx confirmed in the proposal phase of the cycle the tx
    /// belongs to.
    pub fn on_confirmed_proposal_received(
        &mut self,
        payload: ProposalPayload,
        view: &DaoView<'_>,
    ) -> Result<bool, GovernanceError> {
        if !payload.verify()? {
            return Err(ValidationError::InvalidSignature.into());
        }
        let tx_height = payload
            .tx_id()
            .and_then(|id| view.ledger.get_tx(&id))
            .map(|tx| tx.block_height)
            .ok_or(ValidationError::MissingTxId)?;
        self.validator
            .validate_confirmed(&payload.proposal, view, tx_height)?;
        let (hash, is_new) = self.confirmed.add(payload)?;
        if is_new {
            debug!(%hash, "confirmed proposal added from network");
        }
        Ok(is_new)
    }

    /// Withdraw a preliminary proposal. Permitted while its fee tx is
    /// unconfirmed or the cycle of that tx is still in its proposal phase.
    pub fn remove_proposal(&mut self, hash: &Digest, view: &DaoView<'_>) -> Result<ProposalPayload, GovernanceError> {
        let payload = self
            .preliminary
            .get(hash)
            .ok_or_else(|| GovernanceError::ProposalNotFound(hash.to_string()))?;
        let confirmed_at = payload
            .tx_id()
            .and_then(|id| view.ledger.get_tx(&id))
            .map(|tx| tx.block_height);
        let permitted = match confirmed_at {
            None => true,
            Some(tx_height) => view.period.is_still_in_phase(tx_height, Phase::Proposal),
        };
        if !permitted {
            warn!(uid = %payload.proposal.uid, ?confirmed_at, "removal outside the proposal phase refused");
            return Err(GovernanceError::InvariantViolation(format!(
                "proposal {} removed after its proposal phase",
                payload.proposal.uid
            )));
        }
        let removed = self
            .preliminary
            .remove(hash)
            .ok_or_else(|| GovernanceError::ProposalNotFound(hash.to_string()))?;
        info!(uid = %removed.proposal.uid, "proposal removed");
        Ok(removed)
    }

    pub fn preliminary(&self) -> impl Iterator<Item = &ProposalPayload> {
        self.preliminary.values()
    }

    pub fn confirmed(&self) -> impl Iterator<Item = &ProposalPayload> {
        self.confirmed.values()
    }

    /// Confirmed proposals of the cycle containing `height`, sorted by tx id.
    pub fn confirmed_for_cycle(&self, view: &DaoView<'_>, height: u64) -> Vec<&Proposal> {
        let mut proposals: Vec<&Proposal> = self
            .confirmed
            .values()
            .map(|p| &p.proposal)
            .filter(|p| self.validator.validate_confirmed(p, view, height).is_ok())
            .collect();
        proposals.sort_by_key(|p| p.tx_id);
        proposals
    }

    /// Drain payloads promoted since the last call, for publishing.
    pub fn take_republished(&mut self) -> Vec<ProposalPayload> {
        std::mem::take(&mut self.republished)
    }

    /// Promote every still-valid preliminary proposal. Runs at the first
    /// block of the blind-vote phase; the preliminary list is empty after.
    fn republish(&mut self, view: &DaoView<'_>, height: u64) -> Vec<StateChangeEvent> {
        let mut events = Vec::new();
        let candidates: Vec<ProposalPayload> = self.preliminary.values().cloned().collect();
        self.preliminary.retain(|_, _| false);

        for payload in candidates {
            let proposal = &payload.proposal;
            let checked = self
                .validator
                .validate_structure(proposal, view)
                .and_then(|()| self.validator.validate_confirmed(proposal, view, height));
            if let Err(err) = checked {
                warn!(uid = %proposal.uid, %err, "proposal dropped at blind-vote start");
                continue;
            }
            let (Some(tx_id), Ok(commitment)) = (proposal.tx_id, proposal.commitment_digest()) else {
                continue;
            };
            match self.confirmed.add(payload.clone()) {
                Ok((hash, _)) => {
                    info!(uid = %payload.proposal.uid, %tx_id, %hash, height, "proposal republished");
                    events.push(StateChangeEvent::ProposalConfirmed { tx_id, commitment });
                    self.republished.push(payload);
                }
                Err(err) => warn!(%tx_id, %err, "proposal could not be stored"),
            }
        }
        events
    }
}

impl StateChangeProvider for ProposalService {
    fn on_block(&mut self, view: &DaoView<'_>, block: &Block) -> Vec<StateChangeEvent> {
        if view.period.is_first_block_in_phase(block.height, Phase::BlindVote) {
            return self.republish(view, block.height);
        }
        if view.period.is_first_block_in_phase(block.height, Phase::Proposal) {
            let before = self.preliminary.len();
            self.preliminary.retain(|_, p| {
                p.tx_id()
                    .and_then(|id| view.ledger.get_tx(&id))
                    .is_none()
            });
            debug!(dropped = before - self.preliminary.len(), "stale preliminary proposals dropped");
        }
        Vec::new()
    }
}

