use catalog_model::{ScanJobId, ScanType, StorageRoot};
use tokio_util::sync::CancellationToken;

/// Relative urgency of a queued job. The queue itself is FIFO; priority is
/// carried for logging and for callers that order their own submissions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum ScanPriority {
    Low,
    #[default]
    Normal,
    High,
}

/// A unit of scan work. Immutable once queued.
#[derive(Debug, Clone)]
pub struct ScanJob {
    pub id: ScanJobId,
    pub storage_root: StorageRoot,
    /// Directory to start from, relative to the root; `/` scans everything.
    pub path: String,
    pub scan_type: ScanType,
    pub max_depth: u32,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub priority: ScanPriority,
    /// Cancelling this token aborts the job wherever it is.
    pub cancel: CancellationToken,
}

impl ScanJob {
    /// A full scan of `path` using the root's depth and filter settings.
    pub fn new(storage_root: StorageRoot, path: impl Into<String>) -> Self {
        let max_depth = storage_root.max_depth;
        let include_patterns = storage_root.include_patterns.clone();
        let exclude_patterns = storage_root.exclude_patterns.clone();
        Self {
            id: ScanJobId::new(),
            storage_root,
            path: path.into(),
            scan_type: ScanType::Full,
            max_depth,
            include_patterns,
            exclude_patterns,
            priority: ScanPriority::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_scan_type(mut self, scan_type: ScanType) -> Self {
        self.scan_type = scan_type;
        self
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_include_patterns(mut self, patterns: Vec<String>) -> Self {
        self.include_patterns = patterns;
        self
    }

    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }

    pub fn with_priority(mut self, priority: ScanPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_inherits_root_settings() {
        let mut root = StorageRoot::local("media", "/srv/media");
        root.max_depth = 3;
        root.exclude_patterns = vec![".*".into()];

        let job = ScanJob::new(root, "/");
        assert_eq!(job.max_depth, 3);
        assert_eq!(job.exclude_patterns, vec![".*".to_string()]);
        assert_eq!(job.scan_type, ScanType::Full);
        assert!(!job.cancel.is_cancelled());
    }
}
