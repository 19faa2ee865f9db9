//! Shard management module
//!
//! Splits the corpus across independent worker processes and runs this
//! process's shard.

mod partition;
mod state;
mod worker;

pub use partition::{partition, ShardAssignment};
pub use state::{FileEntry, FileStatus, ProgressCounts, ShardState};
pub use worker::{ShardWorker, DEFAULT_BATCH_SIZE};
