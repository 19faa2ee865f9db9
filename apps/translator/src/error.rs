//! Domain error types for the corpus translator
//!
//! main.rs is the ONLY module allowed to use anyhow::Result (process boundary).
//! All application code returns Result<T, TranslatorError>.

use std::path::PathBuf;
use thiserror::Error;

/// Translator domain errors
///
/// Every variant carries the context needed to act on it without parsing
/// the message string.
///
/// Example log output:
/// ```text
/// TranslatorError::InvalidShard { worker_count: 4, worker_index: 4 }
/// → "invalid shard assignment: worker index 4 is outside 0..4"
/// ```
#[derive(Error, Debug)]
pub enum TranslatorError {
    /// Worker count is zero or worker index is out of range
    #[error("invalid shard assignment: worker index {worker_index} is outside 0..{worker_count}")]
    InvalidShard {
        worker_count: usize,
        worker_index: usize,
    },

    /// Configuration error (file, environment or CLI value missing or invalid)
    #[error("configuration error: {0}")]
    Config(String),

    /// Requested profile is neither built in nor declared in the config file
    #[error("unknown profile '{name}'")]
    UnknownProfile { name: String },

    /// Filesystem operation failed
    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// HTTP transport to the generation backend failed
    #[error("request to {endpoint} failed")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// Generation backend answered with a non-success status
    #[error("backend returned status {status}: {body}")]
    Backend { status: u16, body: String },

    /// Generation backend answered without any choices
    #[error("backend returned no completion for model '{model}'")]
    EmptyCompletion { model: String },

    /// Report or payload serialization failed
    #[error("serialization failed")]
    Serialization(#[from] serde_json::Error),

    /// Prometheus recorder could not be installed
    #[error("metrics setup failed: {0}")]
    Metrics(String),

    /// Translation task panicked or was cancelled
    #[error("translation task did not finish")]
    Task(#[source] tokio::task::JoinError),
}

impl TranslatorError {
    /// Returns a static label string suitable for Prometheus metrics.
    ///
    /// Used as the `error_type` label on `translator_errors_total`.
    pub fn error_type_label(&self) -> &'static str {
        match self {
            Self::InvalidShard { .. } => "invalid_shard",
            Self::Config(_) => "config",
            Self::UnknownProfile { .. } => "unknown_profile",
            Self::Io { .. } => "io",
            Self::Request { .. } => "request",
            Self::Backend { .. } => "backend",
            Self::EmptyCompletion { .. } => "empty_completion",
            Self::Serialization(_) => "serialization",
            Self::Metrics(_) => "metrics",
            Self::Task(_) => "task",
        }
    }

    /// Message followed by every source in the chain, `: `-separated
    pub fn with_sources(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            message.push_str(": ");
            message.push_str(&err.to_string());
            source = err.source();
        }
        message
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
