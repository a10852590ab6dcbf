//! Single-file document source with an explicit stop signal

use super::summary::{IngestStats, IngestSummary};
use crate::decompress;
use crate::document::Document;
use crate::errors::{IngestError, IngestResult, ReaderError};
use crate::readers::{DocumentReader, DocumentReaderOpener};
use async_channel::Sender;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Streams the documents of one file onto a channel until end-of-stream,
/// a read error, or `stop()`
pub struct SingleFileReader {
    path: PathBuf,
    opener: Arc<dyn DocumentReaderOpener>,
}

enum Pushed {
    Sent,
    Stopped,
    Closed,
}

impl SingleFileReader {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, opener: Arc<dyn DocumentReaderOpener>) -> Self {
        Self {
            path: path.into(),
            opener,
        }
    }

    /// Open the file and start producing
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Open, decompression and reader construction errors are returned
    /// here rather than from the producer.
    pub fn start(self, tx: Sender<Document>) -> Result<SingleFileHandle, ReaderError> {
        let input = decompress::open(&self.path)?;
        let reader = self.opener.open(input)?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let stats = Arc::new(IngestStats::default());
        stats.files_discovered.store(1, Ordering::Relaxed);

        let producer = {
            let stats = Arc::clone(&stats);
            let tx = tx.clone();
            let runtime = Handle::current();
            let path = self.path.clone();
            tokio::task::spawn_blocking(move || produce(reader, tx, stop_rx, runtime, stats, path))
        };

        let supervisor = tokio::spawn(async move {
            let joined = producer.await;
            tx.close();
            joined.map_err(|e| IngestError::TaskFailed(format!("single file producer: {e}")))?;
            Ok::<_, IngestError>(stats.snapshot())
        });

        Ok(SingleFileHandle {
            stop_tx,
            supervisor,
        })
    }
}

fn produce(
    mut reader: Box<dyn DocumentReader>,
    tx: Sender<Document>,
    mut stop_rx: watch::Receiver<bool>,
    runtime: Handle,
    stats: Arc<IngestStats>,
    path: PathBuf,
) {
    let outcome = loop {
        let doc = match reader.read() {
            Ok(Some(doc)) => doc,
            Ok(None) => break "end of stream".to_string(),
            Err(e) => {
                stats.files_failed.fetch_add(1, Ordering::Relaxed);
                break e.to_string();
            }
        };

        let pushed = runtime.block_on(async {
            tokio::select! {
                biased;
                () = stopped(&mut stop_rx) => Pushed::Stopped,
                sent = tx.send(doc) => match sent {
                    Ok(()) => Pushed::Sent,
                    Err(_) => Pushed::Closed,
                },
            }
        });

        match pushed {
            Pushed::Sent => {
                stats.documents.fetch_add(1, Ordering::Relaxed);
            }
            Pushed::Stopped => break "stopped".to_string(),
            Pushed::Closed => break "output channel closed".to_string(),
        }
    };

    if stats.files_failed.load(Ordering::Relaxed) == 0 {
        stats.files_processed.store(1, Ordering::Relaxed);
    }
    stats.walk_complete.store(true, Ordering::Release);
    log::info!("Single file reader for {} exiting: {}", path.display(), outcome);
}

/// Resolves once a stop was requested; never resolves if the handle is gone
async fn stopped(stop_rx: &mut watch::Receiver<bool>) {
    if stop_rx.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Handle on a running single-file reader
pub struct SingleFileHandle {
    stop_tx: watch::Sender<bool>,
    supervisor: JoinHandle<IngestResult<IngestSummary>>,
}

impl SingleFileHandle {
    /// Ask the producer to stop; it ends at its next send attempt
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    /// Wait for the producer to exit and the channel to be closed
    ///
    /// # Errors
    ///
    /// Returns `TaskFailed` if the producer panicked.
    pub async fn join(self) -> IngestResult<IngestSummary> {
        self.supervisor
            .await
            .map_err(|e| IngestError::TaskFailed(format!("single file supervisor: {e}")))?
    }
}
