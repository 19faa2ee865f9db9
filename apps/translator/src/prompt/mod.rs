//! Prompt construction
//!
//! Turns file text into chat dialogues or flat prompts according to a
//! configured [`Profile`].

mod message;
mod profile;

pub use message::{ChatMessage, Role};
pub use profile::{resolve_profile, Profile, SamplingConfig, DEFAULT_PROFILE};
