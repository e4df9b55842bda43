//! Height-driven cycle and phase state machine.

use crate::cycle::Cycle;
use crate::error::PeriodError;
use crate::snapshot::PeriodSnapshot;
use dao_ledger::Ledger;
use dao_types::{Param, Phase};
use tracing::{debug, info};

/// Emitted by [`PeriodEngine::on_new_height`] when the phase at the new
/// height differs from the previous one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseChange {
    pub height: u64,
    pub previous: Phase,
    pub current: Phase,
    pub cycle_index: usize,
}

#[derive(Clone, Debug, Default)]
pub struct PeriodEngine {
    /// Never shrinks except through [`PeriodEngine::truncate`].
    cycles: Vec<Cycle>,
    chain_height: Option<u64>,
    current_phase: Phase,
}

impl PeriodEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the cycle history for every height the ledger holds.
    pub fn rebuild(ledger: &Ledger) -> Result<Self, PeriodError> {
        let mut engine = Self::new();
        if let Some(head) = ledger.chain_height() {
            for height in ledger.genesis().block_height..=head {
                engine.on_new_height(height, ledger)?;
            }
        }
        Ok(engine)
    }

    // ── Advance ──────────────────────────────────────────────────────────

    /// Advance to `height`. Must be called before the block at `height` is
    /// parsed, so the ledger holds every block below it.
    pub fn on_new_height(&mut self, height: u64, ledger: &Ledger) -> Result<Option<PhaseChange>, PeriodError> {
        let genesis_height = ledger.genesis().block_height;
        match self.cycles.last() {
            None if height != genesis_height => {
                return Err(PeriodError::NotStarted {
                    height,
                    genesis_height,
                })
            }
            None => {
                let cycle = Cycle::from_durations(height, |phase| {
                    ledger.param_value(Param::for_phase(phase), height)
                })?;
                self.push_cycle(cycle);
            }
            Some(current) if height < current.height_of_first_block() => {
                return Err(PeriodError::HeightRegressed {
                    height,
                    cycle_start: current.height_of_first_block(),
                })
            }
            Some(_) => {
                while let Some(last) = self.cycles.last() {
                    if height <= last.height_of_last_block() {
                        break;
                    }
                    let next = next_cycle(last, ledger)?;
                    self.push_cycle(next);
                }
            }
        }

        self.chain_height = Some(height);
        let phase = self.phase_for_height(height);
        if phase == self.current_phase {
            return Ok(None);
        }
        let change = PhaseChange {
            height,
            previous: self.current_phase,
            current: phase,
            cycle_index: self.cycles.len() - 1,
        };
        self.current_phase = phase;
        info!(height, phase = %phase, cycle = change.cycle_index, "phase changed");
        Ok(Some(change))
    }

    fn push_cycle(&mut self, cycle: Cycle) {
        info!(
            index = self.cycles.len(),
            first_block = cycle.height_of_first_block(),
            last_block = cycle.height_of_last_block(),
            "cycle created"
        );
        self.cycles.push(cycle);
    }

    /// Drop every cycle starting above `height` and rewind the head to it.
    /// Used after a ledger restore.
    pub fn truncate(&mut self, height: u64) {
        self.cycles.retain(|c| c.height_of_first_block() <= height);
        if self.cycles.is_empty() {
            self.chain_height = None;
            self.current_phase = Phase::Undefined;
        } else {
            self.chain_height = Some(height);
            self.current_phase = self.phase_for_height(height);
        }
        debug!(height, cycles = self.cycles.len(), "period engine truncated");
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub fn chain_height(&self) -> Option<u64> {
        self.chain_height
    }

    pub fn current_phase(&self) -> Phase {
        self.current_phase
    }

    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    pub fn current_cycle(&self) -> Option<&Cycle> {
        self.cycles.last()
    }

    /// Linear scan of the cycle history.
    pub fn cycle_index_for_height(&self, height: u64) -> Option<usize> {
        self.cycles.iter().position(|c| c.contains(height))
    }

    pub fn cycle_for_height(&self, height: u64) -> Option<&Cycle> {
        self.cycles.iter().find(|c| c.contains(height))
    }

    /// `Undefined` for heights outside the known cycles.
    pub fn phase_for_height(&self, height: u64) -> Phase {
        self.cycle_for_height(height)
            .and_then(|c| c.phase_for_height(height))
            .unwrap_or(Phase::Undefined)
    }

    /// First block of `phase` in the cycle containing `height`.
    pub fn first_block_of_phase(&self, height: u64, phase: Phase) -> Option<u64> {
        self.cycle_for_height(height)?.first_block_of_phase(phase)
    }

    pub fn last_block_of_phase(&self, height: u64, phase: Phase) -> Option<u64> {
        self.cycle_for_height(height)?.last_block_of_phase(phase)
    }

    pub fn is_in_phase(&self, height: u64, phase: Phase) -> bool {
        self.phase_for_height(height) == phase
    }

    pub fn is_first_block_in_phase(&self, height: u64, phase: Phase) -> bool {
        self.first_block_of_phase(height, phase) == Some(height)
    }

    pub fn is_last_block_in_phase(&self, height: u64, phase: Phase) -> bool {
        self.last_block_of_phase(height, phase) == Some(height)
    }

    pub fn is_in_same_cycle(&self, a: u64, b: u64) -> bool {
        self.cycle_for_height(a)
            .is_some_and(|c| c.contains(b))
    }

    /// Whether a tx at `tx_height` lies in `phase` of the cycle that contains
    /// `current_height`.
    pub fn is_tx_in_phase_and_cycle(&self, tx_height: u64, phase: Phase, current_height: u64) -> bool {
        self.is_in_same_cycle(tx_height, current_height) && self.is_in_phase(tx_height, phase)
    }

    /// Whether the current head is still in `phase` of the cycle containing
    /// `height`.
    pub fn is_still_in_phase(&self, height: u64, phase: Phase) -> bool {
        self.chain_height
            .is_some_and(|head| self.is_tx_in_phase_and_cycle(head, phase, height))
    }

    /// Immutable copy for handing to other contexts.
    pub fn snapshot(&self) -> PeriodSnapshot {
        PeriodSnapshot {
            chain_height: self.chain_height,
            phase: self.current_phase,
            cycle_index: self.cycles.len().checked_sub(1),
            cycles: self.cycles.clone(),
        }
    }
}

/// The cycle following `previous`: same durations, except phase durations
/// changed by a vote result recorded in `previous`'s result phase. Later
/// records override earlier ones.
fn next_cycle(previous: &Cycle, ledger: &Ledger) -> Result<Cycle, PeriodError> {
    let first = previous.height_of_last_block() + 1;
    let result_range = previous.phase_range(Phase::VoteResult);
    let overrides: Vec<(Phase, u64)> = ledger
        .state()
        .param_changes()
        .iter()
        .filter(|c| result_range.as_ref().is_some_and(|r| r.contains(&c.recorded_height)))
        .filter_map(|c| c.param.phase().map(|phase| (phase, c.value)))
        .collect();
    for (phase, value) in &overrides {
        info!(first_block = first, phase = %phase, duration = value, "phase duration changed");
    }
    Cycle::from_durations(first, |phase| {
        overrides
            .iter()
            .rev()
            .find(|(p, _)| *p == phase)
            .map_or_else(|| previous.duration_of(phase), |(_, v)| *v)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dao_ledger::{GenesisConfig, StateChangeEvent, TxBlock};
    use dao_types::{BlockHash, NetworkId, Timestamp, TxId};

    const GENESIS: u64 = 100;

    fn hash(h: u64) -> BlockHash {
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&h.to_be_bytes());
        bytes[31] = 7;
        BlockHash::new(bytes)
    }

    fn ledger() -> Ledger {
        let mut config = GenesisConfig::for_network(NetworkId::Regtest);
        config.tx_id = TxId::new([1; 32]);
        config.block_height = GENESIS;
        Ledger::new(config)
    }

    fn empty_block(height: u64) -> TxBlock {
        TxBlock {
            height,
            time: Timestamp::new(height),
            hash: hash(height),
            previous_hash: if height == GENESIS { BlockHash::ZERO } else { hash(height - 1) },
            txs: vec![],
        }
    }

    /// Drive engine and ledger through `heights`, with `events(height)`
    /// collected for each appended block.
    fn run(
        engine: &mut PeriodEngine,
        ledger: &mut Ledger,
        heights: std::ops::RangeInclusive<u64>,
        events: impl Fn(u64) -> Vec<StateChangeEvent>,
    ) -> Vec<PhaseChange> {
        let mut changes = Vec::new();
        for h in heights {
            changes.extend(engine.on_new_height(h, ledger).unwrap());
            ledger.append_block(empty_block(h), |_, _| events(h)).unwrap();
        }
        changes
    }

    #[test]
    fn genesis_cycle_uses_default_durations() {
        let mut ledger = ledger();
        let mut engine = PeriodEngine::new();
        run(&mut engine, &mut ledger, GENESIS..=GENESIS, |_| vec![]);
        let cycle = engine.current_cycle().unwrap();
        assert_eq!(cycle.height_of_first_block(), GENESIS);
        assert_eq!(cycle.duration(), 14);
        assert_eq!(engine.current_phase(), Phase::Proposal);
    }

    #[test]
    fn must_start_at_genesis() {
        let ledger = ledger();
        let mut engine = PeriodEngine::new();
        assert_eq!(
            engine.on_new_height(GENESIS + 1, &ledger),
            Err(PeriodError::NotStarted {
                height: GENESIS + 1,
                genesis_height: GENESIS
            })
        );
    }

    #[test]
    fn emits_every_phase_change_once() {
        let mut ledger = ledger();
        let mut engine = PeriodEngine::new();
        let changes = run(&mut engine, &mut ledger, GENESIS..=GENESIS + 13, |_| vec![]);
        let phases: Vec<Phase> = changes.iter().map(|c| c.current).collect();
        assert_eq!(phases, Phase::ALL[1..].to_vec());
        assert_eq!(changes[0].previous, Phase::Undefined);
    }

    #[test]
    fn new_cycle_follows_without_gap() {
        let mut ledger = ledger();
        let mut engine = PeriodEngine::new();
        let changes = run(&mut engine, &mut ledger, GENESIS..=GENESIS + 14, |_| vec![]);
        assert_eq!(engine.cycles().len(), 2);
        assert_eq!(engine.cycles()[1].height_of_first_block(), GENESIS + 14);
        let last = changes.last().unwrap();
        assert_eq!((last.previous, last.current, last.cycle_index), (Phase::Break4, Phase::Proposal, 1));
    }

    #[test]
    fn duration_change_in_result_phase_applies_to_next_cycle_only() {
        let mut ledger = ledger();
        let mut engine = PeriodEngine::new();
        // regtest result phase of the first cycle: GENESIS+11 ..= GENESIS+12
        run(&mut engine, &mut ledger, GENESIS..=GENESIS + 20, |h| {
            if h == GENESIS + 11 {
                vec![StateChangeEvent::ParamChange {
                    param: Param::PhaseProposal,
                    value: 10,
                    recorded_height: h,
                    activation_height: GENESIS + 14,
                }]
            } else {
                vec![]
            }
        });
        assert_eq!(engine.cycles()[0].duration_of(Phase::Proposal), 4);
        assert_eq!(engine.cycles()[1].duration_of(Phase::Proposal), 10);
        assert_eq!(engine.phase_for_height(GENESIS + 20), Phase::Proposal);
    }

    #[test]
    fn change_outside_result_phase_is_ignored() {
        let mut ledger = ledger();
        let mut engine = PeriodEngine::new();
        run(&mut engine, &mut ledger, GENESIS..=GENESIS + 14, |h| {
            if h == GENESIS + 3 {
                vec![StateChangeEvent::ParamChange {
                    param: Param::PhaseBlindVote,
                    value: 9,
                    recorded_height: h,
                    activation_height: h,
                }]
            } else {
                vec![]
            }
        });
        assert_eq!(engine.cycles()[1].duration_of(Phase::BlindVote), 2);
    }

    #[test]
    fn tx_cycle_membership_is_by_height() {
        let mut ledger = ledger();
        let mut engine = PeriodEngine::new();
        run(&mut engine, &mut ledger, GENESIS..=GENESIS + 16, |_| vec![]);
        assert!(engine.is_tx_in_phase_and_cycle(GENESIS + 15, Phase::Proposal, GENESIS + 16));
        assert!(!engine.is_tx_in_phase_and_cycle(GENESIS + 1, Phase::Proposal, GENESIS + 16));
        assert_eq!(engine.cycle_index_for_height(GENESIS + 13), Some(0));
        assert_eq!(engine.cycle_index_for_height(GENESIS + 14), Some(1));
        assert!(engine.is_first_block_in_phase(GENESIS + 5, Phase::BlindVote));
        assert!(engine.is_last_block_in_phase(GENESIS + 6, Phase::BlindVote));
    }

    #[test]
    fn rebuild_matches_incremental_run() {
        let mut ledger = ledger();
        let mut engine = PeriodEngine::new();
        run(&mut engine, &mut ledger, GENESIS..=GENESIS + 30, |_| vec![]);
        // the incremental engine has also seen the height about to be parsed
        let rebuilt = PeriodEngine::rebuild(&ledger).unwrap();
        assert_eq!(rebuilt.cycles(), engine.cycles());
        assert_eq!(rebuilt.chain_height(), Some(GENESIS + 30));
    }

    #[test]
    fn truncate_rewinds_cycles() {
        let mut ledger = ledger();
        let mut engine = PeriodEngine::new();
        run(&mut engine, &mut ledger, GENESIS..=GENESIS + 20, |_| vec![]);
        engine.truncate(GENESIS + 5);
        assert_eq!(engine.cycles().len(), 1);
        assert_eq!(engine.current_phase(), Phase::BlindVote);
        assert_eq!(engine.on_new_height(GENESIS + 6, &ledger), Ok(None));
    }
}
