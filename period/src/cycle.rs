//! A single governance cycle.

use crate::error::PeriodError;
use dao_types::Phase;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDuration {
    pub phase: Phase,
    /// Blocks.
    pub duration: u64,
}

/// An ordered run of phases anchored at a first-block height. Immutable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    height_of_first_block: u64,
    phases: Vec<PhaseDuration>,
}

impl Cycle {
    /// `phases` must list every [`Phase`] exactly once, in enum order, and
    /// span at least one block.
    pub fn new(height_of_first_block: u64, phases: Vec<PhaseDuration>) -> Result<Self, PeriodError> {
        let in_order = phases.len() == Phase::ALL.len()
            && phases.iter().zip(Phase::ALL).all(|(p, expected)| p.phase == expected);
        if !in_order {
            return Err(PeriodError::InvalidCycle(
                "phases must be listed once each in cycle order".into(),
            ));
        }
        if phases.iter().all(|p| p.duration == 0) {
            return Err(PeriodError::InvalidCycle("cycle spans no blocks".into()));
        }
        Ok(Self {
            height_of_first_block,
            phases,
        })
    }

    /// Build a cycle from a per-phase duration lookup.
    pub fn from_durations(
        height_of_first_block: u64,
        duration_of: impl Fn(Phase) -> u64,
    ) -> Result<Self, PeriodError> {
        let phases = Phase::ALL
            .into_iter()
            .map(|phase| PhaseDuration {
                phase,
                duration: duration_of(phase),
            })
            .collect();
        Self::new(height_of_first_block, phases)
    }

    pub fn height_of_first_block(&self) -> u64 {
        self.height_of_first_block
    }

    pub fn height_of_last_block(&self) -> u64 {
        self.height_of_first_block + self.duration() - 1
    }

    pub fn phases(&self) -> &[PhaseDuration] {
        &self.phases
    }

    /// Total length in blocks.
    pub fn duration(&self) -> u64 {
        self.phases.iter().map(|p| p.duration).sum()
    }

    pub fn duration_of(&self, phase: Phase) -> u64 {
        self.phases
            .iter()
            .find(|p| p.phase == phase)
            .map_or(0, |p| p.duration)
    }

    pub fn contains(&self, height: u64) -> bool {
        (self.height_of_first_block..=self.height_of_last_block()).contains(&height)
    }

    /// Block range of `phase`, `None` for a zero-length phase.
    pub fn phase_range(&self, phase: Phase) -> Option<RangeInclusive<u64>> {
        let mut start = self.height_of_first_block;
        for p in &self.phases {
            if p.phase == phase {
                return (p.duration > 0).then(|| start..=start + p.duration - 1);
            }
            start += p.duration;
        }
        None
    }

    pub fn first_block_of_phase(&self, phase: Phase) -> Option<u64> {
        self.phase_range(phase).map(|r| *r.start())
    }

    pub fn last_block_of_phase(&self, phase: Phase) -> Option<u64> {
        self.phase_range(phase).map(|r| *r.end())
    }

    /// Walk the phases in order accumulating durations; the height falls in
    /// the first phase whose range includes it.
    pub fn phase_for_height(&self, height: u64) -> Option<Phase> {
        if height < self.height_of_first_block {
            return None;
        }
        let mut end = self.height_of_first_block;
        for p in &self.phases {
            end += p.duration;
            if height < end {
                return Some(p.phase);
            }
        }
        None
    }
}
