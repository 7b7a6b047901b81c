mod case;
mod stage;

pub use case::{CaseRecord, RecordKey, RecordUpdate, TransitionError};
pub use stage::{Stage, StageState, StateCounts};
