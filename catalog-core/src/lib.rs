//! # Catalog Core
//!
//! Indexes heterogeneous storage backends (local disk, SMB, FTP, NFS, WebDAV)
//! into one PostgreSQL catalog.
//!
//! ## Overview
//!
//! - **Scan orchestration**: a bounded job queue drained by a fixed worker
//!   pool, with a separate permit pool capping concurrent traversals
//! - **Protocol scanners**: one scanner per protocol walking a root through a
//!   [`fs::FileSystemClient`]
//! - **Catalog writes**: idempotent upserts keyed on `(storage_root, path)`
//!   and per-directory deletion reconciliation
//! - **Move tracking**: deletions are parked briefly and paired with later
//!   creations of the same content, so renames keep their record
//! - **Aggregation**: top-level directories become movies, shows, albums,
//!   books and the like after every completed scan
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use catalog_core::{
//!     CatalogRepositories, CatalogWriter, CoordinatorConfig, DefaultClientFactory,
//!     MoveTracker, MoveTrackerConfig, ScanCoordinator, ScanJob, ScannerRegistry,
//! };
//! use catalog_model::StorageRoot;
//!
//! async fn scan_once(pool: sqlx::PgPool) -> catalog_core::Result<()> {
//!     let repositories = CatalogRepositories::postgres(pool);
//!     let tracker = Arc::new(MoveTracker::new(
//!         MoveTrackerConfig::default(),
//!         repositories.rename_events.clone(),
//!     ));
//!     let writer = Arc::new(CatalogWriter::new(&repositories, tracker));
//!     let coordinator = ScanCoordinator::new(
//!         CoordinatorConfig::default(),
//!         ScannerRegistry::with_defaults(),
//!         Arc::new(DefaultClientFactory::new()),
//!         writer,
//!         None,
//!     );
//!
//!     coordinator.start().await?;
//!     coordinator.queue_scan(ScanJob::new(StorageRoot::local("media", "/srv/media"), "/"))?;
//!     coordinator.stop().await;
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

/// Post-scan classification of directories into media entities
pub mod aggregation;

/// Catalog writer and extension classification
pub mod catalog;

/// Repository ports and their PostgreSQL and in-memory implementations
pub mod database;

/// Error types and the crate result alias
pub mod error;

/// Filesystem client abstraction and bundled clients
pub mod fs;

/// Move detection across scans
pub mod moves;

/// Slash-separated catalog path helpers
pub mod paths;

/// Scan jobs, scanners and the coordinator
pub mod scan;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub use aggregation::{AggregationConfig, AggregationService, AggregationSummary};
pub use catalog::{CatalogWriter, WriteOutcome};
pub use database::{CatalogRepositories, InMemoryCatalog};
pub use error::{CatalogError, Result};
pub use fs::{
    ClientFactory, DefaultClientFactory, FileSystemClient, InMemoryClient, LocalClient,
    RemoteFileInfo, StorageConfig,
};
pub use moves::{MoveStatistics, MoveTracker, MoveTrackerConfig};
pub use scan::{
    CoordinatorConfig, ProtocolScanner, ScanCoordinator, ScanJob, ScanStatus, ScannerRegistry,
};
