//! Download orchestration
//!
//! The [`Orchestrator`] walks an [`AssetTree`] depth-first, skips files whose
//! local copy passes the configured integrity check and hands the rest to a
//! bounded pool of fetch workers, one batch per worker.
//!
//! ```no_run
//! use assetsync::{AssetTree, Fingerprint, MirrorSet, Orchestrator, SyncConfig};
//! use std::path::Path;
//!
//! # async fn run() -> assetsync::Result<()> {
//! let fingerprint = Fingerprint::load("fingerprint.json").await?;
//! let tree = fingerprint.to_tree()?.with_unlisted_items();
//! let mirrors = MirrorSet::new(["https://game-assets.example.com"], fingerprint.content_id())?;
//!
//! let orchestrator = Orchestrator::new(SyncConfig::default(), mirrors)?;
//! let report = orchestrator.synchronize(&tree, Path::new("assets")).await?;
//! println!("{} files failed", report.counts().failed());
//! # Ok(())
//! # }
//! ```

pub mod batch;
mod worker;


use std::path::Path;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use crate::config::{MirrorSet, SyncConfig};
use crate::core::error::{FileOperation, Result, SyncError};
use crate::core::outcome::{FetchOutcome, FetchRecord, SyncReport};
use crate::core::progress::{emit, ProgressCallback, SyncEvent};
use crate::core::tree::{join_posix, AssetTree, Batch, Group};
use crate::core::validation::is_up_to_date;
use crate::decompress::{Decompressor, ScDecompressor};
use crate::transport::{HttpTransport, Transport};

pub use batch::BatchBuilder;
use worker::{local_path, FetchWorker, WorkerContext};

/// Cloneable handle that aborts an [`Orchestrator`] from another task
#[derive(Debug, Clone)]
pub struct AbortHandle {
    token: CancellationToken,
}

impl AbortHandle {
    pub fn abort(&self) {
        self.token.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// A running worker as seen by the orchestrator
struct WorkerHandle {
    id: usize,
    dir: String,
    stop: CancellationToken,
    handle: JoinHandle<bool>,
}

/// State of one `synchronize` call
struct Run {
    context: Arc<WorkerContext>,
    pool: Arc<Semaphore>,
    workers: Vec<WorkerHandle>,
    records: UnboundedReceiver<FetchRecord>,
    report: SyncReport,
    next_worker_id: usize,
    announced_abort: bool,
    /// Some worker left part of its batch unprocessed
    stopped_early: bool,
}

/// Synchronizes asset trees into a local directory
pub struct Orchestrator {
    config: Arc<SyncConfig>,
    mirrors: Arc<MirrorSet>,
    transport: Arc<dyn Transport>,
    decompressor: Arc<dyn Decompressor>,
    progress: Option<ProgressCallback>,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Create an orchestrator using the reqwest transport and the SC decompressor
    pub fn new(config: SyncConfig, mirrors: MirrorSet) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::from_config(&config)?;

        Ok(Self {
            config: Arc::new(config),
            mirrors: Arc::new(mirrors),
            transport: Arc::new(transport),
            decompressor: Arc::new(ScDecompressor::new()),
            progress: None,
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    pub fn with_decompressor<D: Decompressor + 'static>(mut self, decompressor: D) -> Self {
        self.decompressor = Arc::new(decompressor);
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Stop dispatching, ask every running worker to stop after its current
    /// file and discard batches not yet dispatched. Irreversible.
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            token: self.cancel.clone(),
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Bring `destination` in line with `tree`.
    ///
    /// Per-file problems are reported in the returned [`SyncReport`]; an
    /// `Err` means the run could not start at all.
    pub async fn synchronize(&self, tree: &AssetTree, destination: &Path) -> Result<SyncReport> {
        if self.is_aborted() {
            return Err(SyncError::Cancelled {
                reason: "orchestrator was aborted before the run started".to_string(),
            });
        }

        tokio::fs::create_dir_all(destination)
            .await
            .map_err(|e| SyncError::file_system(destination, FileOperation::CreateDir, e))?;

        info!(
            "Synchronizing {} files into {} (workers={}, batch={}, strict={:?})",
            tree.leaf_count(),
            destination.display(),
            self.config.max_concurrent_workers,
            self.config.max_batch_size,
            self.config.strict_level
        );

        let (records_tx, records) = mpsc::unbounded_channel();
        let mut run = Run {
            context: Arc::new(WorkerContext {
                transport: Arc::clone(&self.transport),
                decompressor: Arc::clone(&self.decompressor),
                mirrors: Arc::clone(&self.mirrors),
                config: Arc::clone(&self.config),
                destination: destination.to_path_buf(),
                progress: self.progress.clone(),
                records: records_tx,
            }),
            pool: Arc::new(Semaphore::new(self.config.max_concurrent_workers)),
            workers: Vec::new(),
            records,
            report: SyncReport::default(),
            next_worker_id: 0,
            announced_abort: false,
            stopped_early: false,
        };

        self.walk(tree.root(), destination, &mut run).await;
        self.drain(&mut run).await;

        // An abort that arrives after the last file finished loses nothing
        run.report.aborted = run.announced_abort || run.stopped_early;
        let counts = run.report.counts();
        info!(
            "Synchronization finished: {} skipped, {} fetched, {} failed{}",
            counts.skipped,
            counts.fetched(),
            counts.failed(),
            if run.report.aborted { " (aborted)" } else { "" }
        );
        Ok(run.report)
    }

    /// Depth-first walk in manifest order; every batch of a group is
    /// dispatched before its child groups are visited
    async fn walk(&self, root: &Group, destination: &Path, run: &mut Run) {
        let mut stack: Vec<(&Group, String)> = vec![(root, String::new())];

        while let Some((group, dir)) = stack.pop() {
            if self.check_abort(run) {
                return;
            }

            if !dir.is_empty() {
                let path = local_path(destination, &dir);
                if let Err(e) = tokio::fs::create_dir_all(&path).await {
                    SyncError::file_system(path, FileOperation::CreateDir, e)
                        .log("Preparing group directory");
                }
            }

            let mut builder = BatchBuilder::new(dir.clone(), self.config.max_batch_size);
            for leaf in group.leaves() {
                if self.check_abort(run) {
                    return;
                }

                let relative = join_posix(&dir, &leaf.name);
                let path = local_path(destination, &relative);
                if is_up_to_date(leaf, &path, self.config.strict_level).await {
                    emit(&self.progress, SyncEvent::FileSkipped { path: relative.clone() });
                    run.report.records.push(FetchRecord::new(relative, FetchOutcome::Skipped));
                    continue;
                }

                if let Some(batch) = builder.push(leaf.clone()) {
                    self.dispatch(batch, run).await;
                }
            }
            if let Some(batch) = builder.finish() {
                self.dispatch(batch, run).await;
            }

            let children: Vec<&Group> = group.groups().collect();
            for child in children.into_iter().rev() {
                stack.push((child, join_posix(&dir, &child.name)));
            }
        }
    }

    /// Reap finished workers, wait for a pool slot and start a worker.
    /// The batch is dropped if an abort arrives while waiting.
    async fn dispatch(&self, batch: Batch, run: &mut Run) {
        self.reap(run).await;

        let permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            permit = Arc::clone(&run.pool).acquire_owned() => permit.ok(),
        };
        let Some(permit) = permit else {
            self.check_abort(run);
            return;
        };

        let id = run.next_worker_id;
        run.next_worker_id += 1;

        info!("Dispatching {} files of '{}' to worker {}", batch.len(), batch.dir, id);
        emit(
            &self.progress,
            SyncEvent::BatchDispatched {
                worker: id,
                dir: batch.dir.clone(),
                files: batch.len(),
            },
        );

        let stop = self.cancel.child_token();
        let worker = FetchWorker::new(id, stop.clone(), Arc::clone(&run.context));
        let dir = batch.dir.clone();
        let span = info_span!("worker", id, dir = %dir);
        let handle = tokio::spawn(
            async move {
                let _permit = permit;
                worker.run(batch).await
            }
            .instrument(span),
        );

        run.workers.push(WorkerHandle { id, dir, stop, handle });
    }

    /// Collect records of workers that already finished
    async fn reap(&self, run: &mut Run) {
        let (finished, running): (Vec<_>, Vec<_>) = std::mem::take(&mut run.workers)
            .into_iter()
            .partition(|worker| worker.handle.is_finished());
        run.workers = running;

        for worker in finished {
            let result = worker.handle.await;
            collect(worker.id, &worker.dir, result, run);
        }
        run.receive_records();
    }

    /// Wait for every remaining worker
    async fn drain(&self, run: &mut Run) {
        let workers = std::mem::take(&mut run.workers);
        if workers.is_empty() {
            run.receive_records();
            return;
        }
        info!("Waiting for {} workers to finish", workers.len());

        let (labels, handles): (Vec<_>, Vec<_>) = workers
            .into_iter()
            .map(|worker| ((worker.id, worker.dir), worker.handle))
            .unzip();
        let results = join_all(handles).await;

        for ((id, dir), result) in labels.into_iter().zip(results) {
            collect(id, &dir, result, run);
        }
        run.receive_records();
    }

    /// True once aborted; the first time, also stops every running worker
    fn check_abort(&self, run: &mut Run) -> bool {
        if !self.cancel.is_cancelled() {
            return false;
        }
        if !run.announced_abort {
            run.announced_abort = true;
            warn!("Abort requested, stopping {} running workers", run.workers.len());
            emit(
                &self.progress,
                SyncEvent::Aborting {
                    pending_workers: run.workers.len(),
                },
            );
            for worker in &run.workers {
                worker.stop.cancel();
            }
        }
        true
    }
}

impl Run {
    /// Move records sent by workers into the report
    fn receive_records(&mut self) {
        while let Ok(record) = self.records.try_recv() {
            self.report.records.push(record);
        }
    }
}

fn collect(
    id: usize,
    dir: &str,
    result: std::result::Result<bool, tokio::task::JoinError>,
    run: &mut Run,
) {
    match result {
        Ok(stopped_early) => run.stopped_early |= stopped_early,
        Err(e) => {
            error!(worker = id, dir, "Worker terminated abnormally: {}", e);
            run.report.crashed_workers += 1;
        }
    }
}
