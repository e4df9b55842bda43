//! Proposal and ballot lifecycle of the BSQ DAO.
//!
//! Proposals arrive from the network as signed payloads. A proposal that
//! passes structural, signature and phase checks is *preliminary*: it can
//! still be withdrawn. At the first block of the blind-vote phase every
//! preliminary proposal whose fee transaction confirmed in this cycle's
//! proposal phase is republished into an append-only store and becomes
//! *confirmed*. Voting and tallying only ever read the confirmed list.

pub mod ballot;
pub mod error;
pub mod factory;
pub mod proposal;
pub mod service;
pub mod store;
pub mod validation;
pub mod wallet;

pub use ballot::{Ballot, BallotList, BallotListService, Vote};
pub use error::{GovernanceError, ValidationError};
pub use factory::{ProposalDraft, ProposalFactory};
pub use proposal::{Proposal, ProposalKind, ProposalPayload};
pub use service::ProposalService;
pub use store::{AppendOnlyStore, ContentHash, HashMapStore};
pub use validation::ProposalValidator;
pub use wallet::{SignedTx, WalletError, WalletService};
