use crate::cycle::Cycle;
use dao_types::Phase;
use serde::{Deserialize, Serialize};

/// Copy of the engine state handed to observers outside the parser context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodSnapshot {
    pub chain_height: Option<u64>,
    pub phase: Phase,
    pub cycle_index: Option<usize>,
    pub cycles: Vec<Cycle>,
}

impl PeriodSnapshot {
    pub fn current_cycle(&self) -> Option<&Cycle> {
        self.cycle_index.and_then(|i| self.cycles.get(i))
    }
}
