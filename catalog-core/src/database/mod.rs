//! Persistence layer: repository ports, the PostgreSQL adapters, and an
//! in-memory adapter used by tests and dry runs.

pub mod memory;
pub mod ports;
pub mod postgres;

use std::any::type_name_of_val;
use std::fmt;
use std::sync::Arc;

use sqlx::PgPool;

pub use memory::InMemoryCatalog;
pub use ports::{
    DirectoryAnalysisRepository, FileLinkRepository, FileRepository, MediaItemRepository,
    MoveRequest, RenameCounts, RenameEventRepository, StorageRootRepository, UpsertOutcome,
};

/// Every repository the catalog services need, bundled for injection.
#[derive(Clone)]
pub struct CatalogRepositories {
    pub storage_roots: Arc<dyn StorageRootRepository>,
    pub files: Arc<dyn FileRepository>,
    pub rename_events: Arc<dyn RenameEventRepository>,
    pub media_items: Arc<dyn MediaItemRepository>,
    pub file_links: Arc<dyn FileLinkRepository>,
    pub directory_analyses: Arc<dyn DirectoryAnalysisRepository>,
}

impl fmt::Debug for CatalogRepositories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogRepositories")
            .field("storage_roots", &type_name_of_val(self.storage_roots.as_ref()))
            .field("files", &type_name_of_val(self.files.as_ref()))
            .field("rename_events", &type_name_of_val(self.rename_events.as_ref()))
            .field("media_items", &type_name_of_val(self.media_items.as_ref()))
            .field("file_links", &type_name_of_val(self.file_links.as_ref()))
            .field(
                "directory_analyses",
                &type_name_of_val(self.directory_analyses.as_ref()),
            )
            .finish()
    }
}

impl CatalogRepositories {
    /// PostgreSQL-backed repositories sharing one pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            storage_roots: Arc::new(postgres::PostgresStorageRootRepository::new(pool.clone())),
            files: Arc::new(postgres::PostgresFileRepository::new(pool.clone())),
            rename_events: Arc::new(postgres::PostgresRenameEventRepository::new(pool.clone())),
            media_items: Arc::new(postgres::PostgresMediaItemRepository::new(pool.clone())),
            file_links: Arc::new(postgres::PostgresFileLinkRepository::new(pool.clone())),
            directory_analyses: Arc::new(postgres::PostgresDirectoryAnalysisRepository::new(
                pool,
            )),
        }
    }

    /// Every port served by one shared in-memory catalog. Keep a clone of
    /// the `Arc` to inspect the catalog afterwards.
    pub fn in_memory(catalog: Arc<InMemoryCatalog>) -> Self {
        Self {
            storage_roots: catalog.clone(),
            files: catalog.clone(),
            rename_events: catalog.clone(),
            media_items: catalog.clone(),
            file_links: catalog.clone(),
            directory_analyses: catalog,
        }
    }
}
