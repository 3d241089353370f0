mod cache;
mod stats;

pub use cache::{CaptureCache, CaptureOutcome, Snapshot};
pub use stats::CaptureStats;
