//! Repository ports the scan, move and aggregation services depend on.

use async_trait::async_trait;
use catalog_model::{
    DirectoryAnalysis, FileId, FileRecord, MediaFileLink, MediaItem, MediaItemId,
    MediaTypeId, NewFileRecord, NewMediaItem, RenameEvent, StorageRoot, StorageRootId,
};
use chrono::{DateTime, Utc};

use crate::error::Result;

#[async_trait]
pub trait StorageRootRepository: Send + Sync {
    async fn get_by_name(&self, name: &str) -> Result<Option<StorageRoot>>;

    /// Insert a root unless one with the same name exists.
    ///
    /// Returns `None` when the insert lost a race (or the row already existed);
    /// callers re-query by name.
    async fn insert_if_absent(&self, root: &StorageRoot) -> Result<Option<StorageRootId>>;

    /// Insert or update every connection field of a root, keyed by name.
    async fn save(&self, root: &StorageRoot) -> Result<StorageRootId>;

    async fn list(&self) -> Result<Vec<StorageRoot>>;
}

/// Whether an upsert created the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub id: FileId,
    pub inserted: bool,
}

#[async_trait]
pub trait FileRepository: Send + Sync {
    /// Record at `path`, deleted or not.
    async fn get_by_path(
        &self,
        root_id: StorageRootId,
        path: &str,
    ) -> Result<Option<FileRecord>>;

    /// Id of the live directory record at `path`.
    async fn find_directory_id(&self, root_id: StorageRootId, path: &str)
    -> Result<Option<FileId>>;

    /// Insert or refresh a record keyed on `(storage_root_id, path)`; clears
    /// the deleted flag.
    async fn upsert(&self, record: &NewFileRecord) -> Result<UpsertOutcome>;

    /// Live records whose parent path is `dir` (direct children only).
    async fn list_children(&self, root_id: StorageRootId, dir: &str) -> Result<Vec<FileRecord>>;

    /// Live records at or below `path`.
    async fn list_subtree(&self, root_id: StorageRootId, path: &str) -> Result<Vec<FileRecord>>;

    async fn mark_deleted(&self, ids: &[FileId], at: DateTime<Utc>) -> Result<u64>;

    /// Live directories without a parent record.
    async fn top_level_directories(&self, root_id: StorageRootId) -> Result<Vec<FileRecord>>;

    /// Live non-directory records whose parent is `parent_id`.
    async fn child_files(&self, parent_id: FileId) -> Result<Vec<FileRecord>>;

    async fn count(&self, root_id: StorageRootId) -> Result<i64>;
}

/// A matched move ready to be applied.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveRequest {
    pub storage_root_id: StorageRootId,
    pub file_id: FileId,
    pub old_path: String,
    pub new_path: String,
    pub is_directory: bool,
    pub size: i64,
    pub file_hash: Option<String>,
    /// When the source was soft-deleted. Descendants deleted earlier than
    /// this stay deleted through a directory move.
    pub deleted_at: DateTime<Utc>,
    pub detected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenameCounts {
    pub total: i64,
    pub processed: i64,
    pub failed: i64,
}

#[async_trait]
pub trait RenameEventRepository: Send + Sync {
    /// Apply a move and append its audit event atomically.
    ///
    /// The path rewrite (and, for directories, every descendant rewrite) and
    /// the `processed` event commit together. When the rewrite fails the
    /// transaction rolls back, a `failed` event is appended on its own, and
    /// the original error is returned.
    async fn record_move(&self, request: &MoveRequest) -> Result<RenameEvent>;

    async fn counts(&self) -> Result<RenameCounts>;

    /// Newest first, optionally scoped to one root.
    async fn recent(&self, root_id: Option<StorageRootId>, limit: i64) -> Result<Vec<RenameEvent>>;
}

#[async_trait]
pub trait MediaItemRepository: Send + Sync {
    async fn get_media_type_by_name(&self, name: &str) -> Result<MediaTypeId>;

    async fn get_by_title(&self, title: &str, media_type_id: MediaTypeId)
    -> Result<Option<MediaItem>>;

    async fn get_child_by_title(
        &self,
        parent_id: MediaItemId,
        title: &str,
        media_type_id: MediaTypeId,
    ) -> Result<Option<MediaItem>>;

    async fn create(&self, item: &NewMediaItem) -> Result<MediaItem>;

    async fn update(&self, item: &MediaItem) -> Result<()>;

    async fn list_child_items(&self, parent_id: MediaItemId) -> Result<Vec<MediaItem>>;
}

#[async_trait]
pub trait FileLinkRepository: Send + Sync {
    async fn link_file_to_item(
        &self,
        media_item_id: MediaItemId,
        file_id: FileId,
        is_primary: bool,
    ) -> Result<()>;

    async fn links_for_item(&self, media_item_id: MediaItemId) -> Result<Vec<MediaFileLink>>;
}

#[async_trait]
pub trait DirectoryAnalysisRepository: Send + Sync {
    async fn get_by_path(&self, directory_path: &str) -> Result<Option<DirectoryAnalysis>>;

    /// Insert `analysis` (its `id` is ignored) and return the stored row id.
    async fn create(&self, analysis: &DirectoryAnalysis) -> Result<i64>;

    async fn update(&self, analysis: &DirectoryAnalysis) -> Result<()>;
}
