//! Text-generation backend
//!
//! The worker talks to the model only through [`TextGenerator`]. The
//! production implementation is [`OpenAiClient`], which speaks the
//! OpenAI-compatible HTTP API served by vLLM, llama.cpp and Ollama.

mod client;
mod types;

pub use client::OpenAiClient;

use crate::error::TranslatorError;
use crate::prompt::{ChatMessage, Profile, SamplingConfig};
use serde::Deserialize;
use std::future::Future;

/// Which endpoint the backend is driven through
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// `/chat/completions` with role-tagged messages
    #[default]
    Chat,
    /// `/completions` with a single flattened prompt
    Completion,
}

/// Backend connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base URL including the API version, e.g. `http://localhost:8000/v1`
    pub endpoint: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    #[serde(default)]
    pub mode: GenerationMode,
}

/// Prompt payload in the shape the backend mode expects
#[derive(Debug, Clone, PartialEq)]
pub enum Prompt {
    Chat(Vec<ChatMessage>),
    Plain(String),
}

/// One generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: Prompt,
    pub sampling: SamplingConfig,
}

impl GenerationRequest {
    /// Wrap `content` in the profile's template for the given mode
    pub fn build(profile: &Profile, content: &str, mode: GenerationMode) -> Self {
        let prompt = match mode {
            GenerationMode::Chat => Prompt::Chat(profile.messages(content)),
            GenerationMode::Completion => Prompt::Plain(profile.plain_prompt(content)),
        };

        Self {
            prompt,
            sampling: profile.sampling.clone(),
        }
    }
}

/// Anything that can turn a prompt into generated text
pub trait TextGenerator: Send + Sync + 'static {
    /// Prompt shape this generator wants
    fn mode(&self) -> GenerationMode {
        GenerationMode::Chat
    }

    fn generate(
        &self,
        request: GenerationRequest,
    ) -> impl Future<Output = Result<String, TranslatorError>> + Send;
}
