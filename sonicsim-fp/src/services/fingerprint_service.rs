//! Background fingerprint worker pool
//!
//! A fixed number of Tokio worker tasks pull jobs from one bounded queue and
//! run the CPU-heavy pipeline on the blocking thread pool. Submission never
//! blocks: [`FingerprintService::generate_async`] fails fast with
//! [`ServiceError::QueueFull`], while batches are fed by a background task
//! that waits for queue space.
//!
//! Batch results flow back over a fan-in channel to a single aggregator task,
//! which owns the progress counter and calls the progress and completion
//! callbacks in order.

use super::fingerprinter::Fingerprinter;
use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::models::FingerprintOutcome;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Per-path results of a batch, in submission order with duplicates removed
pub type BatchResults = Vec<(PathBuf, FingerprintOutcome)>;

type Reply = Box<dyn FnOnce(PathBuf, FingerprintOutcome) + Send + 'static>;

struct Job {
    path: PathBuf,
    reply: Reply,
}

/// Handle to one queued fingerprint job
#[derive(Debug)]
pub struct PendingFingerprint {
    path: PathBuf,
    rx: oneshot::Receiver<FingerprintOutcome>,
}

impl PendingFingerprint {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for the job's outcome
    pub async fn wait(self) -> Result<FingerprintOutcome, ServiceError> {
        self.rx.await.map_err(|_| ServiceError::WorkerLost)
    }
}

/// Handle to a running batch
#[derive(Debug)]
pub struct PendingBatch {
    total: usize,
    rx: oneshot::Receiver<BatchResults>,
}

impl PendingBatch {
    /// Number of input paths, duplicates included
    pub fn total(&self) -> usize {
        self.total
    }

    /// Wait for every path in the batch to finish
    pub async fn wait(self) -> Result<BatchResults, ServiceError> {
        self.rx.await.map_err(|_| ServiceError::WorkerLost)
    }
}

/// Owned fingerprint worker pool
pub struct FingerprintService {
    sender: RwLock<Option<mpsc::Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    cancel: CancellationToken,
    runtime: Handle,
    capacity: usize,
    worker_count: usize,
}

impl FingerprintService {
    /// Start `config.workers` workers on the current Tokio runtime
    pub fn new(config: &ServiceConfig, fingerprinter: Arc<Fingerprinter>) -> Result<Self, ServiceError> {
        let runtime = Handle::try_current().map_err(|_| ServiceError::NoRuntime)?;
        let worker_count = config.workers.max(1);
        let capacity = config.queue_capacity.max(1);

        let (sender, receiver) = mpsc::channel::<Job>(capacity);
        let receiver = Arc::new(Mutex::new(receiver));
        let cancel = CancellationToken::new();

        let workers = (0..worker_count)
            .map(|worker_id| {
                runtime.spawn(worker_loop(
                    worker_id,
                    Arc::clone(&receiver),
                    Arc::clone(&fingerprinter),
                    cancel.clone(),
                ))
            })
            .collect();

        tracing::info!(workers = worker_count, queue_capacity = capacity, "Fingerprint service started");

        Ok(Self {
            sender: RwLock::new(Some(sender)),
            workers: Mutex::new(workers),
            cancel,
            runtime,
            capacity,
            worker_count,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn queue_capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_shut_down(&self) -> bool {
        self.current_sender().is_none()
    }

    /// Queue `path`; `on_done` runs exactly once on a worker thread
    ///
    /// The returned handle resolves to the same outcome `on_done` receives.
    pub fn generate_async<F>(&self, path: impl Into<PathBuf>, on_done: F) -> Result<PendingFingerprint, ServiceError>
    where
        F: FnOnce(&Path, &FingerprintOutcome) + Send + 'static,
    {
        let path = path.into();
        let sender = self.current_sender().ok_or(ServiceError::ShutDown)?;
        let (tx, rx) = oneshot::channel();

        let job = Job {
            path: path.clone(),
            reply: Box::new(move |path: PathBuf, outcome: FingerprintOutcome| {
                on_done(&path, &outcome);
                let _ = tx.send(outcome);
            }),
        };

        sender.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ServiceError::QueueFull {
                capacity: self.capacity,
            },
            mpsc::error::TrySendError::Closed(_) => ServiceError::ShutDown,
        })?;

        Ok(PendingFingerprint { path, rx })
    }

    /// Queue `path` without a callback
    pub fn submit(&self, path: impl Into<PathBuf>) -> Result<PendingFingerprint, ServiceError> {
        self.generate_async(path, |_, _| {})
    }

    /// Fingerprint many files
    ///
    /// Each distinct path runs once. `on_progress(done, total, path)` is
    /// called once per input path, serially and with `done` increasing by
    /// one each time, so a path listed twice ticks twice and the last call
    /// has `done == total == paths.len()`. `on_completion` is called exactly
    /// once with one entry per distinct path; paths that never ran (abort,
    /// worker loss) report
    /// [`AnalysisStatus::Cancelled`](crate::models::AnalysisStatus::Cancelled).
    pub fn generate_batch<P, C>(
        &self,
        paths: Vec<PathBuf>,
        mut on_progress: P,
        on_completion: C,
    ) -> Result<PendingBatch, ServiceError>
    where
        P: FnMut(usize, usize, &Path) + Send + 'static,
        C: FnOnce(&BatchResults) + Send + 'static,
    {
        let sender = self.current_sender().ok_or(ServiceError::ShutDown)?;

        let total = paths.len();
        let mut first_seen: HashMap<PathBuf, usize> = HashMap::new();
        let mut unique: Vec<PathBuf> = Vec::new();
        let mut occurrences: Vec<usize> = Vec::new();
        for path in paths {
            match first_seen.get(&path) {
                Some(&idx) => occurrences[idx] += 1,
                None => {
                    first_seen.insert(path.clone(), unique.len());
                    unique.push(path);
                    occurrences.push(1);
                }
            }
        }
        let distinct = unique.len();
        let (done_tx, done_rx) = oneshot::channel();

        if distinct == 0 {
            let results = BatchResults::new();
            on_completion(&results);
            let _ = done_tx.send(results);
            return Ok(PendingBatch { total, rx: done_rx });
        }

        tracing::info!(total, distinct, "Fingerprint batch started");

        let (fan_tx, mut fan_rx) = mpsc::unbounded_channel::<(usize, PathBuf, FingerprintOutcome)>();

        let order = unique.clone();
        self.runtime.spawn(async move {
            let mut slots: Vec<Option<FingerprintOutcome>> = vec![None; distinct];
            let mut resolved = 0;
            let mut done = 0;

            while resolved < distinct {
                let Some((idx, path, outcome)) = fan_rx.recv().await else {
                    break;
                };
                if slots[idx].is_some() {
                    continue;
                }
                slots[idx] = Some(outcome);
                resolved += 1;
                for _ in 0..occurrences[idx] {
                    done += 1;
                    on_progress(done, total, &path);
                }
            }

            if resolved < distinct {
                tracing::warn!(done, total, "Fingerprint batch ended early; marking rest cancelled");
            }

            let results: BatchResults = order
                .into_iter()
                .zip(slots)
                .map(|(path, slot)| (path, slot.unwrap_or_else(FingerprintOutcome::cancelled)))
                .collect();

            tracing::info!(total, distinct, "Fingerprint batch complete");
            on_completion(&results);
            let _ = done_tx.send(results);
        });

        let cancel = self.cancel.clone();
        self.runtime.spawn(async move {
            for (idx, path) in unique.into_iter().enumerate() {
                if cancel.is_cancelled() {
                    let _ = fan_tx.send((idx, path, FingerprintOutcome::cancelled()));
                    continue;
                }

                let fan = fan_tx.clone();
                let job = Job {
                    path: path.clone(),
                    reply: Box::new(move |path: PathBuf, outcome: FingerprintOutcome| {
                        let _ = fan.send((idx, path, outcome));
                    }),
                };

                tokio::select! {
                    sent = sender.send(job) => {
                        if sent.is_err() {
                            let _ = fan_tx.send((idx, path, FingerprintOutcome::cancelled()));
                        }
                    }
                    _ = cancel.cancelled() => {
                        let _ = fan_tx.send((idx, path, FingerprintOutcome::cancelled()));
                    }
                }
            }
        });

        Ok(PendingBatch { total, rx: done_rx })
    }

    /// Stop accepting jobs; queued and running jobs still finish
    ///
    /// Returns immediately. Use [`join`](Self::join) to wait for the drain.
    pub fn shutdown(&self) {
        let taken = match self.sender.write() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if taken.is_some() {
            tracing::info!("Fingerprint service shutting down");
        }
    }

    /// Cancel queued and running jobs, then shut down
    ///
    /// Jobs observe the cancellation between pipeline stages and complete
    /// with `Cancelled`.
    pub fn abort(&self) {
        tracing::warn!("Fingerprint service aborted");
        self.cancel.cancel();
        self.shutdown();
    }

    /// Shut down (if not already) and wait for all workers to exit
    pub async fn join(&self) {
        self.shutdown();
        let handles: Vec<JoinHandle<()>> = self.workers.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Fingerprint worker terminated abnormally");
            }
        }
    }

    fn current_sender(&self) -> Option<mpsc::Sender<Job>> {
        match self.sender.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
    fingerprinter: Arc<Fingerprinter>,
    cancel: CancellationToken,
) {
    loop {
        let job = receiver.lock().await.recv().await;
        let Some(Job { path, reply }) = job else {
            break;
        };

        let fingerprinter = Arc::clone(&fingerprinter);
        let cancel = cancel.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                fingerprinter.generate_cancellable(&path, &cancel)
            }))
            .unwrap_or_else(|panic| {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(path = %path.display(), panic = %message, "Fingerprint pipeline panicked");
                FingerprintOutcome::decode_failed(format!("analysis panicked: {}", message))
            });
            reply(path, outcome);
        })
        .await;

        if let Err(e) = joined {
            tracing::error!(worker_id, error = %e, "Fingerprint completion callback failed");
        }
    }

    tracing::debug!(worker_id, "Fingerprint worker exiting");
}
