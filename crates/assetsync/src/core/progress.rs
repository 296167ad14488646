//! Progress tracking and reporting for synchronization runs

use std::sync::Arc;

use super::outcome::FetchOutcome;

/// Progress callback for synchronization runs
pub type ProgressCallback = Arc<dyn Fn(SyncEvent) + Send + Sync>;

/// Events emitted while a tree is synchronized
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A batch was handed to a newly started worker
    BatchDispatched {
        worker: usize,
        dir: String,
        files: usize,
    },
    /// A file was trusted locally and left alone
    FileSkipped { path: String },
    /// A worker finished a file
    FileFinished {
        worker: usize,
        path: String,
        outcome: FetchOutcome,
    },
    /// A worker stopped, either done or asked to stop
    WorkerFinished { worker: usize, stopped_early: bool },
    /// Abort was requested; no further batches will be dispatched
    Aborting { pending_workers: usize },
}

/// Trait for progress reporting with more granular control
pub trait ProgressReporter: Send + Sync {
    fn on_batch_dispatched(&self, _worker: usize, _dir: &str, _files: usize) {}
    fn on_file_skipped(&self, _path: &str) {}
    fn on_file_finished(&self, _worker: usize, _path: &str, _outcome: &FetchOutcome) {}
    fn on_worker_finished(&self, _worker: usize, _stopped_early: bool) {}
    fn on_aborting(&self, _pending_workers: usize) {}
}

/// Extension trait to convert ProgressReporter to ProgressCallback
pub trait IntoProgressCallback {
    fn into_callback(self) -> ProgressCallback;
}

impl<T: ProgressReporter + 'static> IntoProgressCallback for T {
    fn into_callback(self) -> ProgressCallback {
        Arc::new(move |event| match event {
            SyncEvent::BatchDispatched { worker, dir, files } => {
                self.on_batch_dispatched(worker, &dir, files);
            }
            SyncEvent::FileSkipped { path } => self.on_file_skipped(&path),
            SyncEvent::FileFinished {
                worker,
                path,
                outcome,
            } => self.on_file_finished(worker, &path, &outcome),
            SyncEvent::WorkerFinished {
                worker,
                stopped_early,
            } => self.on_worker_finished(worker, stopped_early),
            SyncEvent::Aborting { pending_workers } => self.on_aborting(pending_workers),
        })
    }
}

/// Simple console progress reporter implementation
#[derive(Debug, Default)]
pub struct ConsoleProgressReporter {
    pub verbose: bool,
}

impl ConsoleProgressReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn on_batch_dispatched(&self, worker: usize, dir: &str, files: usize) {
        let dir = if dir.is_empty() { "Assets" } else { dir };
        println!("[Main] {} folder added to download queue ({} files, worker {})", dir, files, worker);
    }

    fn on_file_skipped(&self, path: &str) {
        if self.verbose {
            println!("[Main] Up to date: {}", path);
        }
    }

    fn on_file_finished(&self, worker: usize, path: &str, outcome: &FetchOutcome) {
        if outcome.is_failure() {
            eprintln!("[worker-{}] {}: {}", worker, path, outcome);
        } else if self.verbose {
            println!("[worker-{}] {}: {}", worker, path, outcome);
        }
    }

    fn on_worker_finished(&self, worker: usize, stopped_early: bool) {
        if self.verbose {
            let state = if stopped_early { "Stopped" } else { "Done" };
            println!("[worker-{}] {}", worker, state);
        }
    }

    fn on_aborting(&self, pending_workers: usize) {
        println!("[Main] Stopping {} workers...", pending_workers);
    }
}

/// Null progress reporter that does nothing
#[derive(Debug, Default)]
pub struct NullProgressReporter;

impl ProgressReporter for NullProgressReporter {}

/// Send an event to an optional callback
pub(crate) fn emit(callback: &Option<ProgressCallback>, event: SyncEvent) {
    if let Some(callback) = callback {
        callback(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl ProgressReporter for Recorder {
        fn on_file_skipped(&self, path: &str) {
            self.seen.lock().unwrap().push(format!("skip {}", path));
        }

        fn on_file_finished(&self, worker: usize, path: &str, outcome: &FetchOutcome) {
            self.seen
                .lock()
                .unwrap()
                .push(format!("{} {} {}", worker, path, outcome));
        }
    }

    #[test]
    fn test_reporter_into_callback_dispatches() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let callback = Recorder { seen: seen.clone() }.into_callback();

        callback(SyncEvent::FileSkipped { path: "a.csv".into() });
        callback(SyncEvent::FileFinished {
            worker: 2,
            path: "b.sc".into(),
            outcome: FetchOutcome::Downloaded,
        });
        callback(SyncEvent::WorkerFinished {
            worker: 2,
            stopped_early: false,
        });

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec!["skip a.csv".to_string(), "2 b.sc downloaded".to_string()]);
    }

    #[test]
    fn test_null_reporter_accepts_everything() {
        let callback = NullProgressReporter.into_callback();
        callback(SyncEvent::Aborting { pending_workers: 3 });
        emit(&Some(callback), SyncEvent::FileSkipped { path: "x".into() });
        emit(&None, SyncEvent::FileSkipped { path: "x".into() });
    }
}
