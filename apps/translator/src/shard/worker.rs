//! Shard worker
//!
//! Drives one worker's shard of the corpus through the generation backend,
//! `batch_size` files at a time.

use crate::backend::{GenerationRequest, TextGenerator};
use crate::corpus::{read_input, OutputSink};
use crate::error::TranslatorError;
use crate::metrics::TranslatorMetrics;
use crate::prompt::Profile;
use crate::shard::state::{ProgressCounts, ShardState};
use crate::shard::ShardAssignment;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Requests in flight at once when not configured
pub const DEFAULT_BATCH_SIZE: usize = 8;

/// Everything a single file translation needs, shared across tasks once
/// the run starts
struct Job<G> {
    generator: Arc<G>,
    profile: Profile,
    sink: OutputSink,
    state: ShardState,
    metrics: Arc<TranslatorMetrics>,
    trim: bool,
}

/// Worker translating one shard of the corpus
pub struct ShardWorker<G: TextGenerator> {
    files: Vec<PathBuf>,
    job: Job<G>,
    batch_size: usize,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl<G: TextGenerator> ShardWorker<G> {
    /// Create a worker for the files of `assignment`'s shard
    ///
    /// # Arguments
    /// * `assignment` - Worker index/count this process runs as
    /// * `files` - The shard, already partitioned
    /// * `generator` - Backend the prompts are sent to
    /// * `profile` - Prompt template and sampling parameters
    /// * `sink` - Where translations are written
    /// * `metrics` - Prometheus metrics
    pub fn new(
        assignment: ShardAssignment,
        files: Vec<PathBuf>,
        generator: Arc<G>,
        profile: Profile,
        sink: OutputSink,
        metrics: Arc<TranslatorMetrics>,
    ) -> Self {
        let state = ShardState::new(assignment, &files);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        Self {
            files,
            job: Job {
                generator,
                profile,
                sink,
                state,
                metrics,
                trim: true,
            },
            batch_size: DEFAULT_BATCH_SIZE,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Set how many requests are in flight at once (at least one)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set whether file contents are trimmed before prompting
    pub fn with_trim(mut self, trim: bool) -> Self {
        self.job.trim = trim;
        self
    }

    /// Get shared state (for progress reporting)
    pub fn state(&self) -> ShardState {
        self.job.state.clone()
    }

    /// Sender that stops the worker before its next batch
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Translate every file of the shard
    ///
    /// Files in a batch run as concurrent tasks; the next batch starts once
    /// the whole batch has finished. A failed file is recorded and the run
    /// continues.
    pub async fn run(mut self) -> ProgressCounts {
        let job = Arc::new(self.job);
        let state = job.state.clone();
        let assignment = state.assignment();
        let batches = self.files.len().div_ceil(self.batch_size);

        job.metrics
            .set_files_assigned(assignment.worker_index(), self.files.len());

        info!(
            worker_index = assignment.worker_index(),
            worker_count = assignment.worker_count(),
            files = self.files.len(),
            batches,
            batch_size = self.batch_size,
            "Shard worker starting"
        );

        for (batch_no, batch) in self.files.chunks(self.batch_size).enumerate() {
            if !matches!(self.shutdown_rx.try_recv(), Err(TryRecvError::Empty)) {
                warn!(
                    worker_index = assignment.worker_index(),
                    remaining = self.files.len() - batch_no * self.batch_size,
                    "Shutdown requested, skipping remaining files"
                );
                break;
            }

            let mut tasks = JoinSet::new();
            let mut in_flight = HashMap::with_capacity(batch.len());
            for path in batch {
                let handle = tasks.spawn(translate_file(Arc::clone(&job), path.clone()));
                in_flight.insert(handle.id(), path.clone());
            }

            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined {
                    match in_flight.remove(&e.id()) {
                        Some(path) => record_task_failure(&job, &path, e),
                        None => error!(error = %e, "Untracked translation task failed"),
                    }
                }
            }

            let counts = state.counts();
            info!(
                batch = batch_no + 1,
                batches,
                translated = counts.translated,
                failed = counts.failed,
                "Batch complete"
            );
        }

        let counts = state.counts();
        info!(
            worker_index = assignment.worker_index(),
            translated = counts.translated,
            failed = counts.failed,
            pending = counts.pending,
            "Shard worker finished"
        );
        counts
    }
}

/// Translate one file, recording the outcome in state and metrics
async fn translate_file<G: TextGenerator>(job: Arc<Job<G>>, path: PathBuf) {
    if let Err(e) = process_file(&job, &path).await {
        warn!(source = %path.display(), error = %e.with_sources(), "Translation failed");
        job.metrics.record_failure(&e);
        job.state.fail(&path, e.with_sources());
    }
}

/// A task that panicked never reached its own failure handling
fn record_task_failure<G: TextGenerator>(job: &Job<G>, path: &Path, e: tokio::task::JoinError) {
    let err = TranslatorError::Task(e);
    error!(source = %path.display(), error = %err.with_sources(), "Translation task panicked");
    job.metrics.record_failure(&err);
    job.state.fail(path, err.with_sources());
}

async fn process_file<G: TextGenerator>(
    job: &Job<G>,
    path: &Path,
) -> Result<(), TranslatorError> {
    let content = read_input(path, job.trim).await?;
    let input_chars = content.chars().count();
    job.state.start(path, input_chars);

    let request = GenerationRequest::build(&job.profile, &content, job.generator.mode());
    let started = Instant::now();
    let text = job.generator.generate(request).await?;
    let elapsed = started.elapsed();

    let output = job.sink.write(path, &text).await?;
    let output_chars = text.chars().count();

    job.state.complete(path, output.clone(), output_chars);
    job.metrics.record_translated(input_chars, output_chars, elapsed);

    info!(
        source = %path.display(),
        output = %output.display(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Translation saved"
    );
    Ok(())
}
