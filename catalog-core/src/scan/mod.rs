//! Scan orchestration: jobs, per-job status, protocol scanners, and the
//! coordinator that runs them.

mod config;
mod coordinator;
mod job;
mod protocol;
mod status;
mod traversal;

pub use config::CoordinatorConfig;
pub use coordinator::ScanCoordinator;
pub use job::{ScanJob, ScanPriority};
pub use protocol::{
    FtpScanner, LocalScanner, NfsScanner, ProtocolScanner, ScanStrategy, ScannerRegistry,
    SmbScanner, WebdavScanner,
};
pub use status::{ScanCounters, ScanStatus};
pub use traversal::{PathFilter, TraversalReport, traverse};
