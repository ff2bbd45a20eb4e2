//! Protocol scanners and the registry the coordinator resolves them from.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use catalog_model::{Protocol, ScanType};

use super::traversal::{TraversalReport, traverse};
use super::{ScanJob, ScanStatus};
use crate::catalog::CatalogWriter;
use crate::error::Result;
use crate::fs::FileSystemClient;

/// How a protocol prefers to be walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanStrategy {
    pub use_recursive_listing: bool,
    /// Entries written between progress reports.
    pub batch_size: usize,
    pub parallel_directories: bool,
    /// Ask the client for a content fingerprint of every file.
    pub checksum_calculation: bool,
    pub metadata_extraction: bool,
    pub real_time_change_detection: bool,
}

/// Walks one protocol's storage root into the catalog.
#[async_trait]
pub trait ProtocolScanner: Send + Sync + fmt::Debug {
    fn protocol(&self) -> Protocol;

    fn scan_strategy(&self) -> ScanStrategy;

    /// Whether an incremental scan can skip reconciliation. Scanners that
    /// cannot run incrementally treat such jobs as full scans.
    fn supports_incremental_scan(&self) -> bool;

    fn optimal_batch_size(&self) -> usize {
        self.scan_strategy().batch_size
    }

    /// Walk `job.path` through `client`, recording every entry with `writer`.
    async fn scan_path(
        &self,
        client: &dyn FileSystemClient,
        job: &ScanJob,
        status: &ScanStatus,
        writer: &CatalogWriter,
    ) -> Result<TraversalReport> {
        let reconcile = match job.scan_type {
            ScanType::Full => true,
            ScanType::Incremental => !self.supports_incremental_scan(),
            ScanType::Verify => false,
        };
        traverse(client, job, status, writer, &self.scan_strategy(), reconcile).await
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalScanner;

#[async_trait]
impl ProtocolScanner for LocalScanner {
    fn protocol(&self) -> Protocol {
        Protocol::Local
    }

    fn scan_strategy(&self) -> ScanStrategy {
        ScanStrategy {
            use_recursive_listing: true,
            batch_size: 1000,
            parallel_directories: true,
            checksum_calculation: true,
            metadata_extraction: true,
            real_time_change_detection: true,
        }
    }

    fn supports_incremental_scan(&self) -> bool {
        true
    }
}

/// SMB listings are chatty; small batches and no content reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmbScanner;

#[async_trait]
impl ProtocolScanner for SmbScanner {
    fn protocol(&self) -> Protocol {
        Protocol::Smb
    }

    fn scan_strategy(&self) -> ScanStrategy {
        ScanStrategy {
            use_recursive_listing: false,
            batch_size: 500,
            parallel_directories: false,
            checksum_calculation: false,
            metadata_extraction: true,
            real_time_change_detection: false,
        }
    }

    fn supports_incremental_scan(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FtpScanner;

#[async_trait]
impl ProtocolScanner for FtpScanner {
    fn protocol(&self) -> Protocol {
        Protocol::Ftp
    }

    fn scan_strategy(&self) -> ScanStrategy {
        ScanStrategy {
            use_recursive_listing: false,
            batch_size: 100,
            parallel_directories: false,
            checksum_calculation: false,
            metadata_extraction: false,
            real_time_change_detection: false,
        }
    }

    fn supports_incremental_scan(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NfsScanner;

#[async_trait]
impl ProtocolScanner for NfsScanner {
    fn protocol(&self) -> Protocol {
        Protocol::Nfs
    }

    fn scan_strategy(&self) -> ScanStrategy {
        ScanStrategy {
            use_recursive_listing: true,
            batch_size: 800,
            parallel_directories: true,
            checksum_calculation: true,
            metadata_extraction: true,
            real_time_change_detection: false,
        }
    }

    fn supports_incremental_scan(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WebdavScanner;

#[async_trait]
impl ProtocolScanner for WebdavScanner {
    fn protocol(&self) -> Protocol {
        Protocol::Webdav
    }

    fn scan_strategy(&self) -> ScanStrategy {
        ScanStrategy {
            use_recursive_listing: false,
            batch_size: 200,
            parallel_directories: false,
            checksum_calculation: false,
            metadata_extraction: true,
            real_time_change_detection: false,
        }
    }

    fn supports_incremental_scan(&self) -> bool {
        false
    }
}

/// Scanners keyed by protocol. Built once and shared by every worker.
#[derive(Clone, Default)]
pub struct ScannerRegistry {
    scanners: HashMap<Protocol, Arc<dyn ProtocolScanner>>,
}

impl fmt::Debug for ScannerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut protocols: Vec<_> = self.scanners.keys().map(Protocol::as_str).collect();
        protocols.sort_unstable();
        f.debug_struct("ScannerRegistry")
            .field("protocols", &protocols)
            .finish()
    }
}

impl ScannerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One scanner for each supported protocol.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(LocalScanner));
        registry.register(Arc::new(SmbScanner));
        registry.register(Arc::new(FtpScanner));
        registry.register(Arc::new(NfsScanner));
        registry.register(Arc::new(WebdavScanner));
        registry
    }

    /// Install `scanner`, replacing any scanner for the same protocol.
    pub fn register(&mut self, scanner: Arc<dyn ProtocolScanner>) {
        self.scanners.insert(scanner.protocol(), scanner);
    }

    pub fn get(&self, protocol: Protocol) -> Option<Arc<dyn ProtocolScanner>> {
        self.scanners.get(&protocol).cloned()
    }

    pub fn supports(&self, protocol: Protocol) -> bool {
        self.scanners.contains_key(&protocol)
    }
}
