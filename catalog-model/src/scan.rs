use std::fmt;

use chrono::{DateTime, Utc};

use crate::ids::ScanJobId;
use crate::protocol::Protocol;

/// How thoroughly a job walks its root.
///
/// Only `Full` scans reconcile deletions; the other kinds upsert what they see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ScanType {
    #[default]
    Full,
    Incremental,
    Verify,
}

/// Lifecycle state of a scan job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ScanState {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ScanState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ScanState::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanState::Running => "running",
            ScanState::Completed => "completed",
            ScanState::Failed => "failed",
            ScanState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time copy of a job's progress counters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanStatusSnapshot {
    pub job_id: ScanJobId,
    pub storage_root: String,
    pub protocol: Protocol,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub current_path: String,
    pub files_processed: u64,
    pub files_found: u64,
    pub files_updated: u64,
    pub files_deleted: u64,
    pub error_count: u64,
    pub state: ScanState,
    pub error: Option<String>,
}
