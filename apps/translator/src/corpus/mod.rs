//! Corpus input and output
//!
//! Discovers the input files of a run, reads them, and writes translations
//! back to disk.

mod discover;
mod sink;

pub use discover::{discover_inputs, read_input, DiscoveryConfig};
pub use sink::{OutputConfig, OutputMode, OutputSink};
