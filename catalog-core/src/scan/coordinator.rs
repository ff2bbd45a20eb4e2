use std::any::type_name_of_val;
use std::collections::HashMap;
use std::fmt;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use catalog_model::{ScanJobId, ScanState, ScanStatusSnapshot};
use futures::future::join_all;
use tokio::sync::{Mutex, RwLock, Semaphore, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use super::protocol::{ProtocolScanner, ScannerRegistry};
use super::{CoordinatorConfig, ScanJob, ScanStatus};
use crate::aggregation::AggregationService;
use crate::catalog::CatalogWriter;
use crate::error::{CatalogError, Result};
use crate::fs::{ClientFactory, FileSystemClient, StorageConfig};

/// A job's live status plus the token that aborts it.
struct TrackedScan {
    status: Arc<ScanStatus>,
    cancel: CancellationToken,
}

type StatusTable = Arc<RwLock<HashMap<ScanJobId, TrackedScan>>>;

/// Everything a worker needs, shared across the pool.
struct WorkerContext {
    scanners: Arc<ScannerRegistry>,
    clients: Arc<dyn ClientFactory>,
    writer: Arc<CatalogWriter>,
    aggregation: Option<Arc<AggregationService>>,
    permits: Arc<Semaphore>,
    statuses: StatusTable,
    retention: Duration,
    shutdown: CancellationToken,
    background: TaskTracker,
}

/// Queues scan jobs and runs them on a fixed worker pool.
///
/// The queue is bounded and `queue_scan` never waits: a full queue is
/// reported as [`CatalogError::QueueFull`]. Traversals are further capped by
/// a permit pool sized independently of the worker count.
pub struct ScanCoordinator {
    config: CoordinatorConfig,
    context: Arc<WorkerContext>,
    sender: mpsc::Sender<ScanJob>,
    receiver: Arc<Mutex<mpsc::Receiver<ScanJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl fmt::Debug for ScanCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let worker_count = self
            .workers
            .try_lock()
            .map(|handles| handles.len())
            .unwrap_or_default();
        let tracked = self
            .context
            .statuses
            .try_read()
            .map(|table| table.len())
            .unwrap_or_default();

        f.debug_struct("ScanCoordinator")
            .field("config", &self.config)
            .field("scanners", &self.context.scanners)
            .field("clients", &type_name_of_val(self.context.clients.as_ref()))
            .field("queued", &self.queue_len())
            .field("available_permits", &self.context.permits.available_permits())
            .field("worker_count", &worker_count)
            .field("tracked_statuses", &tracked)
            .field("shutdown_cancelled", &self.context.shutdown.is_cancelled())
            .finish()
    }
}

impl ScanCoordinator {
    pub fn new(
        config: CoordinatorConfig,
        scanners: ScannerRegistry,
        clients: Arc<dyn ClientFactory>,
        writer: Arc<CatalogWriter>,
        aggregation: Option<Arc<AggregationService>>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let aggregation = aggregation.filter(|_| config.aggregate_after_scan);

        let context = Arc::new(WorkerContext {
            scanners: Arc::new(scanners),
            clients,
            writer,
            aggregation,
            permits: Arc::new(Semaphore::new(config.max_concurrent_scans.max(1))),
            statuses: Arc::new(RwLock::new(HashMap::new())),
            retention: config.status_retention(),
            shutdown: CancellationToken::new(),
            background: TaskTracker::new(),
        });

        Self {
            config,
            context,
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            workers: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn writer(&self) -> &Arc<CatalogWriter> {
        &self.context.writer
    }

    /// Enqueue `job` without waiting. Jobs queued before [`start`] run once
    /// workers exist.
    ///
    /// [`start`]: ScanCoordinator::start
    pub fn queue_scan(&self, job: ScanJob) -> Result<ScanJobId> {
        let job_id = job.id;
        let storage_root = job.storage_root.name.clone();

        self.sender.try_send(job).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => CatalogError::QueueFull {
                capacity: self.sender.max_capacity(),
            },
            mpsc::error::TrySendError::Closed(_) => {
                CatalogError::Internal("scan queue is closed".into())
            }
        })?;

        debug!(job_id = %job_id, storage_root = %storage_root, "scan queued");
        Ok(job_id)
    }

    /// Jobs waiting for a worker.
    pub fn queue_len(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub fn queue_capacity(&self) -> usize {
        self.sender.max_capacity()
    }

    /// Spawn the worker pool and the move tracker's sweeper. Calling it again
    /// while running is a no-op.
    pub async fn start(&self) -> Result<()> {
        if self.context.shutdown.is_cancelled() {
            return Err(CatalogError::Internal(
                "scan coordinator was stopped and cannot be restarted".into(),
            ));
        }

        let mut workers = self.workers.lock().await;
        if !workers.is_empty() {
            return Ok(());
        }

        self.context.writer.tracker().start_sweeper().await;

        for index in 0..self.config.worker_count.max(1) {
            let worker_id = format!("scan-w{index}");
            let context = Arc::clone(&self.context);
            let receiver = Arc::clone(&self.receiver);

            workers.push(tokio::spawn(async move {
                loop {
                    let job = {
                        let mut receiver = receiver.lock().await;
                        tokio::select! {
                            biased;
                            _ = context.shutdown.cancelled() => None,
                            job = receiver.recv() => job,
                        }
                    };
                    let Some(job) = job else {
                        break;
                    };
                    context.run(job, &worker_id).await;
                }
                debug!(worker = %worker_id, "scan worker stopped");
            }));
        }

        info!(
            workers = workers.len(),
            max_concurrent_scans = self.config.max_concurrent_scans,
            queue_capacity = self.queue_capacity(),
            "scan coordinator started"
        );
        Ok(())
    }

    /// Stop taking jobs, wait for in-flight scans and background tasks, then
    /// stop the sweeper. Jobs still queued are discarded.
    ///
    /// Scans still running after the shutdown grace period are cancelled;
    /// `stop` returns only once every worker has exited.
    pub async fn stop(&self) {
        info!("stopping scan coordinator");
        self.context.shutdown.cancel();

        let handles = std::mem::take(&mut *self.workers.lock().await);
        let mut workers = pin!(join_all(handles));
        let results = match tokio::time::timeout(self.config.shutdown_grace(), &mut workers).await
        {
            Ok(results) => results,
            Err(_) => {
                let cancelled = self.context.cancel_running("cancelled by shutdown").await;
                warn!(cancelled, "scans outlived the shutdown grace period, cancelling");
                workers.await
            }
        };
        for result in results {
            if let Err(err) = result {
                warn!(error = %err, "scan worker task failed");
            }
        }

        self.context.background.close();
        self.context.background.wait().await;

        self.context.writer.tracker().stop_sweeper().await;
        info!("scan coordinator stopped");
    }

    pub async fn active_scan_status(&self, job_id: ScanJobId) -> Option<ScanStatusSnapshot> {
        let table = self.context.statuses.read().await;
        table.get(&job_id).map(|tracked| tracked.status.snapshot())
    }

    /// Snapshots of every tracked job, oldest first.
    pub async fn all_active_scan_statuses(&self) -> Vec<ScanStatusSnapshot> {
        let mut snapshots: Vec<_> = {
            let table = self.context.statuses.read().await;
            table
                .values()
                .map(|tracked| tracked.status.snapshot())
                .collect()
        };
        snapshots.sort_by_key(|snapshot| snapshot.started_at);
        snapshots
    }

    /// Abort a running job and mark it cancelled. Returns `false` when the
    /// job is unknown or already finished.
    pub async fn cancel_scan(&self, job_id: ScanJobId) -> bool {
        let table = self.context.statuses.read().await;
        let Some(tracked) = table.get(&job_id) else {
            return false;
        };
        let marked = tracked
            .status
            .finish(ScanState::Cancelled, Some("cancelled by request".into()));
        tracked.cancel.cancel();
        if marked {
            info!(job_id = %job_id, "scan cancelled");
        }
        marked
    }
}

impl WorkerContext {
    /// Cancel every job that has not reached a terminal state.
    async fn cancel_running(&self, reason: &str) -> usize {
        let table = self.statuses.read().await;
        let mut cancelled = 0;
        for (job_id, tracked) in table.iter() {
            if tracked.status.finish(ScanState::Cancelled, Some(reason.to_string())) {
                tracked.cancel.cancel();
                debug!(job_id = %job_id, reason, "scan cancelled");
                cancelled += 1;
            }
        }
        cancelled
    }

    async fn run(&self, job: ScanJob, worker_id: &str) {
        let permit = tokio::select! {
            biased;
            _ = job.cancel.cancelled() => {
                debug!(job_id = %job.id, worker = %worker_id, "scan cancelled before start");
                return;
            }
            permit = Arc::clone(&self.permits).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return,
            },
        };

        let root = &job.storage_root;
        let status = Arc::new(ScanStatus::new(job.id, root.name.clone(), root.protocol));
        self.statuses.write().await.insert(
            job.id,
            TrackedScan {
                status: Arc::clone(&status),
                cancel: job.cancel.clone(),
            },
        );

        info!(
            job_id = %job.id,
            storage_root = %root.name,
            protocol = %root.protocol,
            path = %job.path,
            scan_type = ?job.scan_type,
            worker = %worker_id,
            "scan started"
        );

        let (outcome, client) = match self.open(&job).await {
            Ok((scanner, client)) => {
                let outcome = scanner
                    .scan_path(client.as_ref(), &job, &status, &self.writer)
                    .await;
                (outcome, Some(client))
            }
            Err(err) => (Err(err), None),
        };

        let completed = match outcome {
            Ok(report) => {
                let finished = status.finish(ScanState::Completed, None);
                let snapshot = status.snapshot();
                info!(
                    job_id = %job.id,
                    storage_root = %root.name,
                    files_processed = snapshot.files_processed,
                    files_updated = snapshot.files_updated,
                    files_deleted = snapshot.files_deleted,
                    errors = snapshot.error_count,
                    directories = report.directories_listed,
                    "scan completed"
                );
                finished
            }
            Err(err) => {
                if status.finish(ScanState::Failed, Some(err.to_string())) {
                    error!(
                        job_id = %job.id,
                        storage_root = %root.name,
                        error = %err,
                        "scan failed"
                    );
                }
                false
            }
        };

        if let Some(client) = client
            && let Err(err) = client.disconnect().await
        {
            warn!(job_id = %job.id, error = %err, "disconnect failed");
        }
        drop(permit);

        self.schedule_purge(job.id);
        if completed {
            self.schedule_aggregation(&job).await;
        }
    }

    /// Resolve the scanner and a connected client for `job`.
    async fn open(
        &self,
        job: &ScanJob,
    ) -> Result<(Arc<dyn ProtocolScanner>, Box<dyn FileSystemClient>)> {
        let protocol = job.storage_root.protocol;
        let scanner = self
            .scanners
            .get(protocol)
            .ok_or(CatalogError::UnsupportedProtocol(protocol))?;

        let client = self
            .clients
            .create_client(&StorageConfig::from_root(&job.storage_root))?;

        if let Err(err) = client.connect().await {
            if let Err(disconnect) = client.disconnect().await {
                debug!(job_id = %job.id, error = %disconnect, "disconnect after failed connect");
            }
            return Err(CatalogError::Connection(format!(
                "{} ({protocol}): {err}",
                job.storage_root.name
            )));
        }
        Ok((scanner, client))
    }

    fn schedule_purge(&self, job_id: ScanJobId) {
        let statuses = Arc::clone(&self.statuses);
        let retention = self.retention;
        let shutdown = self.shutdown.clone();

        self.background.spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(retention) => {}
            }
            statuses.write().await.remove(&job_id);
            debug!(job_id = %job_id, "scan status purged");
        });
    }

    async fn schedule_aggregation(&self, job: &ScanJob) {
        let Some(aggregation) = self.aggregation.clone() else {
            return;
        };
        let root_id = match self.writer.resolve_storage_root(&job.storage_root).await {
            Ok(id) => id,
            Err(err) => {
                warn!(job_id = %job.id, error = %err, "cannot aggregate, storage root unresolved");
                return;
            }
        };
        let job_id = job.id;

        self.background.spawn(async move {
            match aggregation.aggregate_after_scan(root_id).await {
                Ok(summary) => info!(
                    job_id = %job_id,
                    directories = summary.directories,
                    created = summary.created,
                    updated = summary.updated,
                    skipped = summary.skipped,
                    failed = summary.failed,
                    "aggregation finished"
                ),
                Err(err) => warn!(job_id = %job_id, error = %err, "aggregation failed"),
            }
        });
    }
}
