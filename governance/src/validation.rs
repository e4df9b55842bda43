//! Proposal validation: structure, signature, phase/cycle and on-chain
//! commitment.

use crate::error::ValidationError;
use crate::proposal::{Proposal, ProposalKind, ProposalPayload};
use dao_period::DaoView;
use dao_protocol::op_return;
use dao_types::{Param, Phase};

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_LINK_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 4_000;

#[derive(Clone, Copy, Debug, Default)]
pub struct ProposalValidator;

impl ProposalValidator {
    pub fn new() -> Self {
        Self
    }

    /// Structural, signature and phase/cycle checks for a payload received
    /// from the network.
    pub fn validate_payload(&self, payload: &ProposalPayload, view: &DaoView<'_>) -> Result<(), ValidationError> {
        self.validate_structure(&payload.proposal, view)?;
        if !payload.verify()? {
            return Err(ValidationError::InvalidSignature);
        }
        self.validate_phase_and_cycle(&payload.proposal, view)
    }

    pub fn validate_structure(&self, proposal: &Proposal, view: &DaoView<'_>) -> Result<(), ValidationError> {
        check_text("uid", &proposal.uid, MAX_NAME_LEN)?;
        check_text("name", &proposal.name, MAX_NAME_LEN)?;
        check_text("link", &proposal.link, MAX_LINK_LEN)?;
        if proposal.description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(ValidationError::FieldTooLong {
                field: "description",
                max: MAX_DESCRIPTION_LEN,
            });
        }

        match &proposal.kind {
            ProposalKind::CompensationRequest { requested } => check_amount(
                *requested,
                view.param(Param::MinCompRequestAmount),
                view.param(Param::MaxCompRequestAmount),
            ),
            ProposalKind::ReimbursementRequest { requested } => check_amount(
                *requested,
                view.param(Param::MinReimbursementRequestAmount),
                view.param(Param::MaxReimbursementRequestAmount),
            ),
            ProposalKind::ChangeParam { param, value } => {
                validate_param_change(*param, *value, view.param(*param))
            }
            ProposalKind::BondedRole { role, bond_units } => {
                if role.trim().is_empty() || *bond_units == 0 {
                    return Err(ValidationError::InvalidBondedRole);
                }
                Ok(())
            }
            ProposalKind::ConfiscateBond { lockup_tx_id } => {
                let is_lockup = view
                    .ledger
                    .get_tx(lockup_tx_id)
                    .is_some_and(|tx| tx.tx_type == dao_types::TxType::Lockup);
                if !is_lockup {
                    return Err(ValidationError::UnknownLockup(*lockup_tx_id));
                }
                if view.ledger.state().is_confiscated(lockup_tx_id) {
                    return Err(ValidationError::AlreadyConfiscated(*lockup_tx_id));
                }
                Ok(())
            }
            ProposalKind::RemoveAsset { ticker } => {
                check_text("ticker", ticker, 10)?;
                if view.ledger.state().is_asset_removed(ticker) {
                    return Err(ValidationError::AssetAlreadyRemoved(ticker.clone()));
                }
                Ok(())
            }
            ProposalKind::Generic => Ok(()),
        }
    }

    /// An unconfirmed proposal is only accepted during the proposal phase; a
    /// confirmed one must have confirmed in the current cycle's proposal
    /// phase.
    pub fn validate_phase_and_cycle(&self, proposal: &Proposal, view: &DaoView<'_>) -> Result<(), ValidationError> {
        let confirmed = proposal
            .tx_id
            .is_some_and(|id| view.ledger.get_tx(&id).is_some());
        if confirmed {
            return self.validate_confirmed(proposal, view, view.height());
        }
        if view.phase() != Phase::Proposal {
            return Err(ValidationError::NotInProposalPhase(view.phase()));
        }
        Ok(())
    }

    /// The fee tx is in the ledger, has the expected type, confirmed in the
    /// proposal phase of the cycle containing `cycle_height` and commits to
    /// this proposal.
    pub fn validate_confirmed(
        &self,
        proposal: &Proposal,
        view: &DaoView<'_>,
        cycle_height: u64,
    ) -> Result<(), ValidationError> {
        let tx_id = proposal.tx_id.ok_or(ValidationError::MissingTxId)?;
        let tx = view
            .ledger
            .get_tx(&tx_id)
            .ok_or(ValidationError::MissingTxId)?;
        let expected = proposal.kind.tx_type();
        if tx.tx_type != expected {
            return Err(ValidationError::TxTypeMismatch {
                tx_id,
                expected,
                actual: tx.tx_type,
            });
        }
        if !view
            .period
            .is_tx_in_phase_and_cycle(tx.block_height, Phase::Proposal, cycle_height)
        {
            return Err(ValidationError::TxNotInProposalPhase {
                tx_id,
                height: tx.block_height,
            });
        }
        let committed = tx
            .op_return_data()
            .and_then(|bytes| op_return::decode(bytes).ok());
        if committed != Some(proposal.op_return_data()?) {
            return Err(ValidationError::CommitmentMismatch(tx_id));
        }
        Ok(())
    }
}

fn check_text(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    if value.chars().count() > max {
        return Err(ValidationError::FieldTooLong { field, max });
    }
    Ok(())
}

fn check_amount(amount: u64, min: u64, max: u64) -> Result<(), ValidationError> {
    if amount < min || amount > max {
        return Err(ValidationError::AmountOutOfRange { amount, min, max });
    }
    Ok(())
}

/// A new value must be governable, in its type's domain, differ from the
/// current value and stay within a factor of two of it.
pub fn validate_param_change(param: Param, value: u64, current: u64) -> Result<(), ValidationError> {
    if !param.is_governable() {
        return Err(ValidationError::ParamNotGovernable(param));
    }
    if !param.param_type().is_in_domain(value) {
        return Err(ValidationError::ParamOutOfDomain { param, value });
    }
    if value == current {
        return Err(ValidationError::ParamUnchanged { param, value });
    }
    if value > current.saturating_mul(2) || value < current / 2 {
        return Err(ValidationError::ParamChangeTooLarge {
            param,
            current,
            value,
        });
    }
    Ok(())
}
