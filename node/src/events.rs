//! Events emitted by the parser context for observers.
//!
//! Every event is an immutable value; observers in other tasks receive
//! copies over a `tokio::sync::broadcast` channel and never touch the live
//! ledger or period state.

use dao_governance::ProposalPayload;
use dao_period::PeriodSnapshot;
use dao_types::{BlockHash, Phase, TxId};
use dao_voting::{CycleResult, RecoveryRequest, VoteResultError, VoteRevealError};
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 1024;

#[derive(Clone, Debug)]
pub enum DaoEvent {
    BlockParsed {
        height: u64,
        hash: BlockHash,
        txs: usize,
        events: usize,
    },
    ParseFailed {
        height: u64,
        reason: String,
    },
    PhaseChanged {
        height: u64,
        previous: Phase,
        current: Phase,
        period: PeriodSnapshot,
    },
    ProposalRepublished(ProposalPayload),
    BlindVotePublished {
        tx_id: TxId,
        stake: u64,
    },
    RevealPublished {
        blind_vote_tx_id: TxId,
        reveal_tx_id: TxId,
    },
    RevealFailed(VoteRevealError),
    VoteResultCompleted(CycleResult),
    VoteResultDeferred {
        request: RecoveryRequest,
        error: VoteResultError,
    },
    /// The ledger was rewound to `restored_height`; blocks are expected
    /// again from `resume_from`.
    Reorg {
        failed_height: u64,
        restored_height: Option<u64>,
        resume_from: u64,
    },
    BroadcastFailed {
        tx_id: TxId,
        reason: String,
    },
}

/// Fan-out of [`DaoEvent`]s. Emitting never blocks the parser; slow
/// receivers see `Lagged` instead.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DaoEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DaoEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: DaoEvent) {
        // no subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
