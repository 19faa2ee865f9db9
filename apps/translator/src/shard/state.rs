//! Per-file progress tracking for one worker's shard

use crate::shard::ShardAssignment;
use dashmap::DashMap;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Processing status for a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Not started yet
    Pending,
    /// Request in flight
    Translating,
    /// Output written
    Translated,
    /// Read, generation or write failed
    Failed,
}

impl FileStatus {
    /// Returns true once the file will not change state again
    pub fn is_done(&self) -> bool {
        matches!(self, FileStatus::Translated | FileStatus::Failed)
    }
}

/// State for a single file
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub status: FileStatus,
    pub output: Option<PathBuf>,
    pub error: Option<String>,
    pub input_chars: usize,
    pub output_chars: usize,
    pub started_at: Option<Instant>,
    pub elapsed: Option<Duration>,
}

impl Default for FileEntry {
    fn default() -> Self {
        Self {
            status: FileStatus::Pending,
            output: None,
            error: None,
            input_chars: 0,
            output_chars: 0,
            started_at: None,
            elapsed: None,
        }
    }
}

/// Snapshot of counts across the shard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressCounts {
    pub files_total: usize,
    pub pending: usize,
    pub translating: usize,
    pub translated: usize,
    pub failed: usize,
}

impl ProgressCounts {
    pub fn done(&self) -> usize {
        self.translated + self.failed
    }

    /// Files that started but produced no translation, counting ones still
    /// marked translating after the run ended
    pub fn unfinished(&self) -> usize {
        self.failed + self.translating
    }
}

/// Shared progress state for the files of one shard
#[derive(Debug, Clone)]
pub struct ShardState {
    inner: Arc<ShardStateInner>,
}

#[derive(Debug)]
struct ShardStateInner {
    assignment: ShardAssignment,
    order: Vec<PathBuf>,
    files: DashMap<PathBuf, FileEntry>,
}

impl ShardState {
    /// Create a tracker with every file pending
    pub fn new(assignment: ShardAssignment, files: &[PathBuf]) -> Self {
        let entries = DashMap::with_capacity(files.len());
        for path in files {
            entries.insert(path.clone(), FileEntry::default());
        }

        Self {
            inner: Arc::new(ShardStateInner {
                assignment,
                order: files.to_vec(),
                files: entries,
            }),
        }
    }

    pub fn assignment(&self) -> ShardAssignment {
        self.inner.assignment
    }

    /// Mark a file as in flight
    pub fn start(&self, path: &Path, input_chars: usize) {
        if let Some(mut entry) = self.inner.files.get_mut(path) {
            entry.status = FileStatus::Translating;
            entry.input_chars = input_chars;
            entry.started_at = Some(Instant::now());
        }
    }

    /// Record a written output
    pub fn complete(&self, path: &Path, output: PathBuf, output_chars: usize) {
        if let Some(mut entry) = self.inner.files.get_mut(path) {
            entry.status = FileStatus::Translated;
            entry.output = Some(output);
            entry.output_chars = output_chars;
            entry.elapsed = entry.started_at.map(|t| t.elapsed());
        }
    }

    /// Record a failure
    pub fn fail(&self, path: &Path, error: String) {
        if let Some(mut entry) = self.inner.files.get_mut(path) {
            entry.status = FileStatus::Failed;
            entry.error = Some(error);
            entry.elapsed = entry.started_at.map(|t| t.elapsed());
        }
    }

    /// Get status for a specific file
    pub fn status(&self, path: &Path) -> Option<FileStatus> {
        self.inner.files.get(path).map(|e| e.status)
    }

    /// Entries in shard order
    pub fn entries(&self) -> Vec<(PathBuf, FileEntry)> {
        self.inner
            .order
            .iter()
            .filter_map(|path| {
                self.inner
                    .files
                    .get(path)
                    .map(|entry| (path.clone(), entry.clone()))
            })
            .collect()
    }

    /// Count files per status
    pub fn counts(&self) -> ProgressCounts {
        let mut counts = ProgressCounts {
            files_total: self.inner.files.len(),
            ..Default::default()
        };

        for entry in self.inner.files.iter() {
            match entry.status {
                FileStatus::Pending => counts.pending += 1,
                FileStatus::Translating => counts.translating += 1,
                FileStatus::Translated => counts.translated += 1,
                FileStatus::Failed => counts.failed += 1,
            }
        }

        counts
    }

    /// True once every file is translated or failed
    pub fn is_finished(&self) -> bool {
        self.inner.files.iter().all(|e| e.status.is_done())
    }
}
