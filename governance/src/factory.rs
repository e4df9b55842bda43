//! Creating a proposal and its fee transaction.

use crate::error::{GovernanceError, ValidationError};
use crate::proposal::{Proposal, ProposalKind, ProposalPayload};
use crate::validation::ProposalValidator;
use crate::wallet::{SignedTx, WalletService};
use dao_period::DaoView;
use dao_protocol::encode;
use dao_types::{KeyPair, Param, Phase, Timestamp};
use tracing::info;

/// User-supplied content of a new proposal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposalDraft {
    pub name: String,
    pub description: String,
    pub link: String,
    pub kind: ProposalKind,
}

pub struct ProposalFactory<'w, W: WalletService + ?Sized> {
    wallet: &'w W,
    validator: ProposalValidator,
}

impl<'w, W: WalletService + ?Sized> ProposalFactory<'w, W> {
    pub fn new(wallet: &'w W) -> Self {
        Self {
            wallet,
            validator: ProposalValidator::new(),
        }
    }

    /// Build, validate and sign a proposal, and have the wallet build the
    /// fee transaction committing to it. Nothing is broadcast or published.
    pub fn create(
        &self,
        keys: &KeyPair,
        draft: ProposalDraft,
        view: &DaoView<'_>,
    ) -> Result<(ProposalPayload, SignedTx), GovernanceError> {
        let phase = view.phase();
        if phase != Phase::Proposal {
            return Err(ValidationError::NotInProposalPhase(phase).into());
        }

        let mut proposal = Proposal {
            uid: hex::encode(rand::random::<[u8; 16]>()),
            name: draft.name,
            description: draft.description,
            link: draft.link,
            owner: keys.public.clone(),
            created_at: Timestamp::now(),
            tx_id: None,
            kind: draft.kind,
        };
        self.validator.validate_structure(&proposal, view)?;

        let op_return = encode(&proposal.op_return_data()?);
        let fee = view.param(Param::ProposalFee);
        let tx = match proposal.kind.requested_amount() {
            Some(requested) => self
                .wallet
                .build_issuance_request_tx(fee, requested, &op_return)?,
            None => self.wallet.build_fee_tx(fee, &op_return)?,
        };

        proposal.tx_id = Some(tx.tx_id);
        let payload = ProposalPayload::sign(proposal, &keys.private)?;
        info!(
            uid = %payload.proposal.uid,
            kind = payload.proposal.kind.name(),
            tx_id = %tx.tx_id,
            fee,
            "proposal created"
        );
        Ok((payload, tx))
    }
}
