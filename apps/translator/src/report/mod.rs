//! Run report
//!
//! JSON summary of one worker's run, written after the last batch.

use crate::error::TranslatorError;
use crate::shard::{FileStatus, ShardState};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Result for a single file
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub source: PathBuf,
    pub output: Option<PathBuf>,
    pub status: FileStatus,
    pub error: Option<String>,
    pub duration_ms: Option<u64>,
    pub input_chars: usize,
    pub output_chars: usize,
}

/// Envelope for one worker's run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub worker_index: usize,
    pub worker_count: usize,
    pub profile: String,
    pub model: String,
    pub started_at: u64,
    pub finished_at: u64,
    pub files: Vec<FileOutcome>,
}

/// Unix time in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

impl RunReport {
    /// Snapshot the shard state into a report
    pub fn from_state(
        state: &ShardState,
        profile: &str,
        model: &str,
        started_at: u64,
    ) -> Self {
        let assignment = state.assignment();
        let files = state
            .entries()
            .into_iter()
            .map(|(source, entry)| FileOutcome {
                source,
                output: entry.output,
                status: entry.status,
                error: entry.error,
                duration_ms: entry.elapsed.map(|d| d.as_millis() as u64),
                input_chars: entry.input_chars,
                output_chars: entry.output_chars,
            })
            .collect();

        Self {
            run_id: Uuid::new_v4().to_string(),
            worker_index: assignment.worker_index(),
            worker_count: assignment.worker_count(),
            profile: profile.to_string(),
            model: model.to_string(),
            started_at,
            finished_at: unix_millis(),
            files,
        }
    }

    pub fn failed(&self) -> usize {
        self.count(FileStatus::Failed)
    }

    pub fn translated(&self) -> usize {
        self.count(FileStatus::Translated)
    }

    fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|f| f.status == status).count()
    }

    /// Write the report as pretty-printed JSON
    pub async fn write(&self, path: &Path) -> Result<(), TranslatorError> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, format!("{content}\n"))
            .await
            .map_err(|e| TranslatorError::io(path, e))
    }
}
