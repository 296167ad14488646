//! Sequential fetching of one batch

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{MirrorSet, SyncConfig};
use crate::core::error::{FileOperation, SyncError};
use crate::core::outcome::{FetchOutcome, FetchRecord};
use crate::core::progress::{emit, ProgressCallback, SyncEvent};
use crate::core::tree::Batch;
use crate::decompress::Decompressor;
use crate::transport::Transport;

/// Everything workers of one run share
pub(crate) struct WorkerContext {
    pub transport: Arc<dyn Transport>,
    pub decompressor: Arc<dyn Decompressor>,
    pub mirrors: Arc<MirrorSet>,
    pub config: Arc<SyncConfig>,
    pub destination: PathBuf,
    pub progress: Option<ProgressCallback>,
    /// Records are sent as each file finishes, so they survive a worker panic
    pub records: UnboundedSender<FetchRecord>,
}

/// Fetches the leaves of one batch in order until done or asked to stop
pub(crate) struct FetchWorker {
    id: usize,
    stop: CancellationToken,
    context: Arc<WorkerContext>,
}

impl FetchWorker {
    pub fn new(id: usize, stop: CancellationToken, context: Arc<WorkerContext>) -> Self {
        Self { id, stop, context }
    }

    /// Process the batch; leaves not reached before a stop produce no record.
    /// Returns whether the worker stopped before the end of its batch.
    pub async fn run(self, batch: Batch) -> bool {
        let mut finished = 0;
        let mut stopped_early = false;

        for leaf in &batch.leaves {
            if self.stop.is_cancelled() {
                stopped_early = true;
                break;
            }

            let relative = batch.relative_path(leaf);
            let outcome = self.fetch(&relative).await;
            if outcome.is_failure() {
                warn!("{}: {}", relative, outcome);
            } else {
                debug!("{}: {}", relative, outcome);
            }

            emit(
                &self.context.progress,
                SyncEvent::FileFinished {
                    worker: self.id,
                    path: relative.clone(),
                    outcome: outcome.clone(),
                },
            );
            // The receiver lives as long as the run that spawned this worker
            let _ = self.context.records.send(FetchRecord::new(relative, outcome));
            finished += 1;
        }

        debug!(files = finished, stopped_early, "worker finished");
        emit(
            &self.context.progress,
            SyncEvent::WorkerFinished {
                worker: self.id,
                stopped_early,
            },
        );
        stopped_early
    }

    async fn fetch(&self, relative: &str) -> FetchOutcome {
        let body = match self.download(relative).await {
            Ok(body) => body,
            Err(last_status) => return FetchOutcome::DownloadFailed { last_status },
        };

        let path = local_path(&self.context.destination, relative);
        if let Err(reason) = write_file(&path, &body).await {
            return FetchOutcome::WriteFailed { reason };
        }

        if !self.context.config.should_decompress(relative) {
            return FetchOutcome::Downloaded;
        }

        let decompressor = Arc::clone(&self.context.decompressor);
        let decoded = tokio::task::spawn_blocking(move || decompressor.decompress(&body)).await;

        match decoded {
            Ok(Ok(data)) => match write_file(&path, &data).await {
                Ok(()) => FetchOutcome::Decompressed,
                Err(reason) => FetchOutcome::WriteFailed { reason },
            },
            Ok(Err(e)) => FetchOutcome::DecompressionFailed {
                reason: e.to_string(),
            },
            Err(e) => FetchOutcome::DecompressionFailed {
                reason: format!("decompressor panicked: {}", e),
            },
        }
    }

    /// Try each mirror in order; on failure returns the last status seen
    async fn download(&self, relative: &str) -> Result<Vec<u8>, Option<u16>> {
        let mut last_status = None;

        for url in self.context.mirrors.urls_for(relative) {
            match self.context.transport.get(&url).await {
                Ok(response) if response.is_ok() => return Ok(response.body),
                Ok(response) => {
                    debug!("{} answered {}", url, response.status);
                    last_status = Some(response.status);
                }
                Err(e) => {
                    debug!(
                        category = e.category(),
                        recoverable = e.is_recoverable(),
                        "{} unreachable: {}",
                        url,
                        e
                    );
                }
            }
        }

        Err(last_status)
    }
}

/// Destination path of a POSIX relative path under `root`
pub(crate) fn local_path(root: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|segment| !segment.is_empty())
        .fold(root.to_path_buf(), |path, segment| path.join(segment))
}

async fn write_file(path: &Path, data: &[u8]) -> Result<(), String> {
    store(path, data).await.map_err(|e| {
        e.log("Could not store download");
        match std::error::Error::source(&e) {
            Some(cause) => format!("{}: {}", e, cause),
            None => e.to_string(),
        }
    })
}

async fn store(path: &Path, data: &[u8]) -> crate::core::error::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| SyncError::file_system(parent, FileOperation::CreateDir, e))?;
    }
    fs::write(path, data)
        .await
        .map_err(|e| SyncError::file_system(path, FileOperation::Write, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_path_joins_segments() {
        let root = Path::new("/assets");
        assert_eq!(local_path(root, "a.csv"), Path::new("/assets/a.csv"));
        assert_eq!(
            local_path(root, "csv_logic/sub/b.csv"),
            Path::new("/assets/csv_logic/sub/b.csv")
        );
    }
}
