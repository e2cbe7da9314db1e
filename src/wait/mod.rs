// Readiness detection: composable conditions evaluated against container snapshots.

mod condition;
mod detector;

pub use condition::{LogPattern, Snapshot, WaitCondition};
pub use detector::{Probe, WaitError, wait_until};
pub(crate) use detector::OUTPUT_TAIL;
