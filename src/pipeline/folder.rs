//! Folder reader: walker, bounded file-worker pool and closing supervisor

use super::summary::{ActiveWorker, IngestStats, IngestSummary};
use crate::decompress;
use crate::document::Document;
use crate::errors::{IngestError, IngestResult, ReaderError, WalkError};
use crate::readers::DocumentReaderOpener;
use crate::walker::{self, FilePath, GlobPattern};
use async_channel::Sender;
use crossbeam_channel::Receiver as PathReceiver;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;
use tokio::task::{JoinHandle, JoinSet};

/// Paths buffered between the walker and the workers, per worker
const PATH_QUEUE_PER_WORKER: usize = 4;

/// Reads every matching file under a root with a fixed number of workers
pub struct FolderReader {
    root: PathBuf,
    pattern: GlobPattern,
    concurrency: usize,
    opener: Arc<dyn DocumentReaderOpener>,
}

impl FolderReader {
    #[must_use]
    pub fn new(
        root: impl Into<PathBuf>,
        pattern: GlobPattern,
        concurrency: usize,
        opener: Arc<dyn DocumentReaderOpener>,
    ) -> Self {
        Self {
            root: root.into(),
            pattern,
            concurrency: concurrency.max(1),
            opener,
        }
    }

    /// Start walking and reading; documents are pushed onto `tx`
    ///
    /// Must be called from within a tokio runtime. The channel is closed by
    /// the pipeline once the walker and every worker have returned.
    pub fn start(self, tx: Sender<Document>) -> IngestionHandle {
        let stats = Arc::new(IngestStats::default());
        let (path_tx, path_rx) =
            crossbeam_channel::bounded::<FilePath>(self.concurrency * PATH_QUEUE_PER_WORKER);

        tracing::info!(
            root = %self.root.display(),
            pattern = self.pattern.as_str(),
            workers = self.concurrency,
            "Starting folder reader"
        );

        let walk_task = {
            let stats = Arc::clone(&stats);
            let root = self.root.clone();
            let pattern = self.pattern;
            tokio::task::spawn_blocking(move || -> Result<(), WalkError> {
                // path_tx drops on return, which closes the path queue
                for entry in walker::walk(&root, pattern) {
                    let file = entry?;
                    stats.files_discovered.fetch_add(1, Ordering::Relaxed);
                    if path_tx.send(file).is_err() {
                        break;
                    }
                }
                stats.walk_complete.store(true, Ordering::Release);
                Ok(())
            })
        };

        let mut workers = JoinSet::new();
        for id in 0..self.concurrency {
            let ctx = WorkerContext {
                id,
                paths: path_rx.clone(),
                tx: tx.clone(),
                opener: Arc::clone(&self.opener),
                stats: Arc::clone(&stats),
            };
            workers.spawn_blocking(move || ctx.run());
        }
        drop(path_rx);

        let supervisor = tokio::spawn(supervise(walk_task, workers, tx, Arc::clone(&stats)));

        IngestionHandle { supervisor, stats }
    }
}

/// Await the walker, then every worker, then close the output channel
async fn supervise(
    walk_task: JoinHandle<Result<(), WalkError>>,
    mut workers: JoinSet<()>,
    tx: Sender<Document>,
    stats: Arc<IngestStats>,
) -> IngestResult<IngestSummary> {
    let start = Instant::now();

    let walk_result = match walk_task.await {
        Ok(result) => result.map_err(IngestError::from),
        Err(e) => Err(IngestError::TaskFailed(format!("walker: {e}"))),
    };

    let mut task_failure = None;
    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "File worker failed");
            task_failure.get_or_insert_with(|| IngestError::TaskFailed(format!("file worker: {e}")));
        }
    }

    // Only this task ever closes the output channel
    let closed_here = tx.close();
    let summary = stats.snapshot();
    tracing::info!(
        files = summary.files_processed,
        failed = summary.files_failed,
        skipped = summary.files_skipped,
        documents = summary.documents,
        closed_here,
        duration_ms = start.elapsed().as_millis() as u64,
        "Folder reader finished"
    );

    walk_result?;
    match task_failure {
        Some(e) => Err(e),
        None => Ok(summary),
    }
}

enum FileOutcome {
    Finished,
    DownstreamClosed,
}

struct WorkerContext {
    id: usize,
    paths: PathReceiver<FilePath>,
    tx: Sender<Document>,
    opener: Arc<dyn DocumentReaderOpener>,
    stats: Arc<IngestStats>,
}

impl WorkerContext {
    fn run(self) {
        let mut downstream_closed = false;

        for file in self.paths.iter() {
            if downstream_closed || self.tx.is_closed() {
                // Drain without opening so the walker can finish
                downstream_closed = true;
                self.stats.files_skipped.fetch_add(1, Ordering::Relaxed);
                continue;
            }

            let _active = ActiveWorker::enter(&self.stats.active_workers);
            tracing::debug!(worker = self.id, path = %file.path.display(), "Reading file");

            match self.read_file(&file.path) {
                Ok(FileOutcome::Finished) => {
                    self.stats.files_processed.fetch_add(1, Ordering::Relaxed);
                }
                Ok(FileOutcome::DownstreamClosed) => {
                    self.stats.files_processed.fetch_add(1, Ordering::Relaxed);
                    downstream_closed = true;
                    tracing::debug!(worker = self.id, "Output channel closed by consumer");
                }
                Err(e) => {
                    self.stats.files_failed.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(path = %file.path.display(), error = %e, "Skipping file");
                }
            }
        }
    }

    fn read_file(&self, path: &Path) -> Result<FileOutcome, ReaderError> {
        let input = decompress::open(path)?;
        let mut reader = self.opener.open(input)?;

        while let Some(doc) = reader.read()? {
            // Blocks while the channel is full
            if self.tx.send_blocking(doc).is_err() {
                return Ok(FileOutcome::DownstreamClosed);
            }
            self.stats.documents.fetch_add(1, Ordering::Relaxed);
        }
        Ok(FileOutcome::Finished)
    }
}

/// Handle on a running folder reader
pub struct IngestionHandle {
    supervisor: JoinHandle<IngestResult<IngestSummary>>,
    stats: Arc<IngestStats>,
}

impl IngestionHandle {
    /// Workers currently reading a file
    #[must_use]
    pub fn active_workers(&self) -> usize {
        self.stats.active_workers.load(Ordering::Acquire)
    }

    /// Counters so far
    #[must_use]
    pub fn progress(&self) -> IngestSummary {
        self.stats.snapshot()
    }

    /// Wait for the pipeline to finish and the channel to be closed
    ///
    /// # Errors
    ///
    /// Returns the walk error that aborted discovery, or `TaskFailed` if a
    /// pipeline task panicked.
    pub async fn join(self) -> IngestResult<IngestSummary> {
        self.supervisor
            .await
            .map_err(|e| IngestError::TaskFailed(format!("supervisor: {e}")))?
    }
}
