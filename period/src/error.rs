use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PeriodError {
    #[error("period engine starts at genesis height {genesis_height}, got {height}")]
    NotStarted { height: u64, genesis_height: u64 },

    #[error("height {height} precedes current cycle starting at {cycle_start}")]
    HeightRegressed { height: u64, cycle_start: u64 },

    #[error("invalid cycle: {0}")]
    InvalidCycle(String),
}
