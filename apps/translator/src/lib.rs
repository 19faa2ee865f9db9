//! Corpus Translator - sharded batch translation through an LLM server
//!
//! Each worker process:
//! - Lists the text files of an input folder in a stable order
//! - Takes its contiguous shard of that list (worker index of worker count)
//! - Wraps every file in a profile's prompt template
//! - Sends the prompts to an OpenAI-compatible server in batches
//! - Writes each answer next to, or appended to, its source

pub mod backend;
pub mod config;
pub mod corpus;
pub mod error;
pub mod health;
pub mod metrics;
pub mod prompt;
pub mod report;
pub mod shard;

pub use config::{Cli, TranslatorConfig};
pub use error::TranslatorError;
pub use shard::{partition, ShardAssignment, ShardWorker};
