use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use catalog_model::{Protocol, ScanJobId, ScanState, ScanStatusSnapshot};
use chrono::Utc;

/// Counter deltas applied to a status in one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanCounters {
    pub processed: u64,
    pub found: u64,
    pub updated: u64,
    pub deleted: u64,
    pub errors: u64,
}

impl ScanCounters {
    pub fn error() -> Self {
        Self {
            errors: 1,
            ..Self::default()
        }
    }
}

/// Live progress of one scan job.
///
/// Workers mutate it through the methods below; everyone else reads
/// [`ScanStatus::snapshot`] copies, never the live value.
#[derive(Debug)]
pub struct ScanStatus {
    inner: RwLock<ScanStatusSnapshot>,
}

impl ScanStatus {
    pub fn new(job_id: ScanJobId, storage_root: impl Into<String>, protocol: Protocol) -> Self {
        Self {
            inner: RwLock::new(ScanStatusSnapshot {
                job_id,
                storage_root: storage_root.into(),
                protocol,
                started_at: Utc::now(),
                finished_at: None,
                current_path: String::new(),
                files_processed: 0,
                files_found: 0,
                files_updated: 0,
                files_deleted: 0,
                error_count: 0,
                state: ScanState::Running,
                error: None,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, ScanStatusSnapshot> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ScanStatusSnapshot> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn job_id(&self) -> ScanJobId {
        self.read().job_id
    }

    pub fn state(&self) -> ScanState {
        self.read().state
    }

    pub fn set_current_path(&self, path: &str) {
        let mut status = self.write();
        status.current_path.clear();
        status.current_path.push_str(path);
    }

    pub fn increment(&self, delta: ScanCounters) {
        let mut status = self.write();
        status.files_processed += delta.processed;
        status.files_found += delta.found;
        status.files_updated += delta.updated;
        status.files_deleted += delta.deleted;
        status.error_count += delta.errors;
    }

    pub fn record_error(&self) {
        self.increment(ScanCounters::error());
    }

    /// Move to a terminal state. A status that is already terminal keeps its
    /// first outcome.
    pub fn finish(&self, state: ScanState, error: Option<String>) -> bool {
        let mut status = self.write();
        if status.state.is_terminal() {
            return false;
        }
        status.state = state;
        status.error = error;
        status.finished_at = Some(Utc::now());
        true
    }

    pub fn snapshot(&self) -> ScanStatusSnapshot {
        self.read().clone()
    }
}
