//! Shared wiring for the catalog-core integration suites.
#![allow(dead_code)]

use std::sync::Arc;

use catalog_core::database::{CatalogRepositories, InMemoryCatalog};
use catalog_core::fs::{DefaultClientFactory, FileSystemClient, InMemoryClient};
use catalog_core::moves::{MoveTracker, MoveTrackerConfig};
use catalog_core::scan::{
    CoordinatorConfig, ScanCoordinator, ScanJob, ScanStatus, ScannerRegistry,
};
use catalog_core::{AggregationConfig, AggregationService, CatalogWriter};
use catalog_model::{
    FileRecord, Protocol, ScanState, ScanStatusSnapshot, ScanType, StorageRoot, StorageRootId,
};

pub const ROOT_NAME: &str = "media";

/// An in-memory catalog plus an in-memory storage tree.
pub struct Harness {
    pub catalog: Arc<InMemoryCatalog>,
    pub repositories: CatalogRepositories,
    pub client: InMemoryClient,
    pub tracker: Arc<MoveTracker>,
    pub writer: Arc<CatalogWriter>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_tracker_config(MoveTrackerConfig::default())
    }

    pub fn with_tracker_config(config: MoveTrackerConfig) -> Self {
        let catalog = Arc::new(InMemoryCatalog::new());
        let repositories = CatalogRepositories::in_memory(Arc::clone(&catalog));
        let tracker = Arc::new(MoveTracker::new(
            config,
            Arc::clone(&repositories.rename_events),
        ));
        let writer = Arc::new(CatalogWriter::new(&repositories, Arc::clone(&tracker)));

        Self {
            catalog,
            repositories,
            client: InMemoryClient::new(Protocol::Local),
            tracker,
            writer,
        }
    }

    pub fn root(&self) -> StorageRoot {
        StorageRoot::local(ROOT_NAME, "/srv/media")
    }

    pub async fn root_id(&self) -> StorageRootId {
        self.writer
            .resolve_storage_root(&self.root())
            .await
            .expect("storage root resolves")
    }

    /// Factory whose local constructor hands out clones of the shared tree.
    pub fn factory(&self) -> Arc<DefaultClientFactory> {
        let client = self.client.clone();
        let mut factory = DefaultClientFactory::new();
        factory.register(Protocol::Local, move |_| {
            Ok(Box::new(client.clone()) as Box<dyn FileSystemClient>)
        });
        Arc::new(factory)
    }

    pub fn aggregation(&self) -> Arc<AggregationService> {
        Arc::new(AggregationService::new(
            self.repositories.clone(),
            AggregationConfig::default(),
        ))
    }

    pub fn coordinator(&self, config: CoordinatorConfig, aggregate: bool) -> ScanCoordinator {
        ScanCoordinator::new(
            config,
            ScannerRegistry::with_defaults(),
            self.factory(),
            Arc::clone(&self.writer),
            aggregate.then(|| self.aggregation()),
        )
    }

    pub fn job(&self) -> ScanJob {
        ScanJob::new(self.root(), "/")
    }

    /// Run one scan of the whole root inline, without the coordinator.
    pub async fn scan(&self, scan_type: ScanType) -> ScanStatusSnapshot {
        self.scan_job(self.job().with_scan_type(scan_type)).await
    }

    /// Run `job` inline, without the coordinator.
    pub async fn scan_job(&self, job: ScanJob) -> ScanStatusSnapshot {
        let status = ScanStatus::new(job.id, ROOT_NAME, Protocol::Local);
        let scanner = ScannerRegistry::with_defaults()
            .get(Protocol::Local)
            .expect("local scanner registered");

        scanner
            .scan_path(&self.client, &job, &status, &self.writer)
            .await
            .expect("scan succeeds");
        status.finish(ScanState::Completed, None);
        status.snapshot()
    }

    pub async fn files(&self) -> Vec<FileRecord> {
        let root_id = self.root_id().await;
        self.catalog.files(root_id).await
    }

    pub async fn live_paths(&self) -> Vec<String> {
        self.files()
            .await
            .into_iter()
            .filter(|file| !file.deleted)
            .map(|file| file.path)
            .collect()
    }

    pub async fn record(&self, path: &str) -> Option<FileRecord> {
        self.files().await.into_iter().find(|file| file.path == path)
    }
}

/// Poll `coordinator` until `job` reaches a terminal state.
pub async fn wait_for_terminal(
    coordinator: &ScanCoordinator,
    job: catalog_model::ScanJobId,
) -> ScanStatusSnapshot {
    for _ in 0..500 {
        if let Some(snapshot) = coordinator.active_scan_status(job).await
            && snapshot.state.is_terminal()
        {
            return snapshot;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("scan {job} did not finish");
}
