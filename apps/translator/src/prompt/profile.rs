//! Named prompt and sampling presets
//!
//! A profile is configuration data: the system prompt, the instruction placed
//! ahead of each file's text, and the sampling parameters handed to the
//! backend. Two presets are built in; the config file may add or override
//! profiles under `[profiles.<name>]`.

use crate::error::TranslatorError;
use crate::prompt::ChatMessage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Profile used when none is configured
pub const DEFAULT_PROFILE: &str = "dialogue";

/// Sampling parameters passed through to the generation backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    pub temperature: f32,
    pub top_p: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl SamplingConfig {
    /// Reject values no backend accepts
    pub fn validate(&self) -> Result<(), TranslatorError> {
        if !(self.temperature >= 0.0) {
            return Err(TranslatorError::Config(format!(
                "temperature must be >= 0, got {}",
                self.temperature
            )));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(TranslatorError::Config(format!(
                "top_p must be in (0, 1], got {}",
                self.top_p
            )));
        }
        if let Some(penalty) = self.repetition_penalty {
            if !(penalty > 0.0) {
                return Err(TranslatorError::Config(format!(
                    "repetition_penalty must be > 0, got {penalty}"
                )));
            }
        }
        if self.max_tokens == Some(0) {
            return Err(TranslatorError::Config(
                "max_tokens must be > 0 when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Prompt template plus sampling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub instruction: String,
    pub sampling: SamplingConfig,
}

impl Profile {
    /// Dialogue for a chat backend: optional system turn, then the
    /// instruction followed by the file text as the user turn
    pub fn messages(&self, content: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if !self.system_prompt.is_empty() {
            messages.push(ChatMessage::system(self.system_prompt.as_str()));
        }
        messages.push(ChatMessage::user(format!("{}{}", self.instruction, content)));
        messages
    }

    /// Same text as [`Profile::messages`] flattened for a completion backend
    pub fn plain_prompt(&self, content: &str) -> String {
        if self.system_prompt.is_empty() {
            format!("{}{}", self.instruction, content)
        } else {
            format!("{}\n\n{}{}", self.system_prompt, self.instruction, content)
        }
    }

    /// Transcript translation: a faithful pass, then a colloquial rewrite
    /// split into paragraphs per speaker
    pub fn dialogue() -> Self {
        Self {
            system_prompt: concat!(
                "Step 1: Read the audio transcription below for context and translate the Chinese text into fluent American English.\n",
                "Step 2: Rewrite that translation in a colloquial style, split into paragraphs by speaker.\n",
                "Return the results of both steps for the Chinese text that follows:\n",
            )
            .to_string(),
            instruction: String::new(),
            sampling: SamplingConfig {
                temperature: 0.3,
                top_p: 0.9,
                repetition_penalty: None,
                max_tokens: None,
            },
        }
    }

    /// Translation, colloquial adaptation and publishing metadata
    /// (titles, descriptions, tags)
    pub fn adaptation() -> Self {
        Self {
            system_prompt: "You are a helpful assistant.".to_string(),
            instruction: concat!(
                "Process the Chinese transcription below in three steps.\n\n",
                "Step 1: Initial Translation\n",
                "Fix obvious typos, then translate into plain modern American English. ",
                "Drop speaker tags and organise the text into paragraphs.\n\n",
                "Step 2: Colloquial Translation\n",
                "Make the translation a little more casual and concise without heavy abbreviation. ",
                "Keep proper paragraphs and convert measurements to US units.\n\n",
                "Step 3: Titles, descriptions and tags\n",
                "Give 5 title options (at most 5 words each), 5 description options ",
                "(at most 12 words each) and 10 SEO tags for short-video platforms.\n\n",
                "Here is the Chinese text:\n",
            )
            .to_string(),
            sampling: SamplingConfig {
                temperature: 0.7,
                top_p: 0.8,
                repetition_penalty: Some(1.05),
                max_tokens: Some(3000),
            },
        }
    }

    /// Built-in preset by name
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "dialogue" => Some(Self::dialogue()),
            "adaptation" => Some(Self::adaptation()),
            _ => None,
        }
    }
}

/// Resolve `name` against config-declared profiles first, then built-ins
pub fn resolve_profile(
    name: &str,
    declared: &HashMap<String, Profile>,
) -> Result<Profile, TranslatorError> {
    let profile = declared
        .get(name)
        .cloned()
        .or_else(|| Profile::builtin(name))
        .ok_or_else(|| TranslatorError::UnknownProfile {
            name: name.to_string(),
        })?;

    profile.sampling.validate()?;
    Ok(profile)
}
