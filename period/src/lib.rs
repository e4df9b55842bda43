//! Period/cycle/phase engine.
//!
//! Maps chain height to a governance [`Phase`](dao_types::Phase). A cycle is
//! an ordered run of phases with voted durations; cycles follow each other
//! without gaps from the genesis height on. A new cycle copies the previous
//! cycle's durations except those changed by a vote result recorded in the
//! previous cycle's result phase.
//!
//! The engine is advanced from the parser context, once per height, before
//! that height's transactions are parsed.

pub mod cycle;
pub mod engine;
pub mod error;
pub mod snapshot;
pub mod view;

pub use cycle::{Cycle, PhaseDuration};
pub use engine::{PeriodEngine, PhaseChange};
pub use error::PeriodError;
pub use snapshot::PeriodSnapshot;
pub use view::{collect_events, DaoView, StateChangeProvider};
