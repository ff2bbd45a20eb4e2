//! In-memory implementation of every repository port.
//!
//! Mirrors the PostgreSQL semantics closely enough for the services' tests:
//! natural-key upserts, soft deletes, and an all-or-nothing move rewrite.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use catalog_model::{
    DirectoryAnalysis, FileId, FileRecord, MediaFileLink, MediaItem, MediaItemId, MediaKind,
    MediaTypeId, NewFileRecord, NewMediaItem, RenameEvent, RenameEventId, RenameStatus,
    StorageRoot, StorageRootId,
};
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::ports::{
    DirectoryAnalysisRepository, FileLinkRepository, FileRepository, MediaItemRepository,
    MoveRequest, RenameCounts, RenameEventRepository, StorageRootRepository, UpsertOutcome,
};
use crate::error::{CatalogError, Result};
use crate::paths;

pub struct InMemoryCatalog {
    state: Mutex<CatalogState>,
}

impl fmt::Debug for InMemoryCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("InMemoryCatalog");
        match self.state.try_lock() {
            Ok(state) => {
                debug
                    .field("roots", &state.roots.len())
                    .field("files", &state.files.len())
                    .field("rename_events", &state.rename_events.len())
                    .field("media_items", &state.media_items.len());
            }
            Err(_) => {
                debug.field("state", &"<locked>");
            }
        }
        debug.finish()
    }
}

#[derive(Default)]
struct CatalogState {
    roots: Vec<StorageRoot>,
    files: BTreeMap<i64, FileRecord>,
    rename_events: Vec<RenameEvent>,
    media_types: Vec<(MediaTypeId, String)>,
    media_items: Vec<MediaItem>,
    links: Vec<MediaFileLink>,
    analyses: Vec<DirectoryAnalysis>,
    next_id: i64,
    fail_moves: bool,
}

impl CatalogState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn file_at(&self, root_id: StorageRootId, path: &str) -> Option<&FileRecord> {
        self.files
            .values()
            .find(|file| file.storage_root_id == root_id && file.path == path)
    }

    fn push_event(&mut self, request: &MoveRequest, status: RenameStatus) -> RenameEvent {
        let event = RenameEvent {
            id: RenameEventId(self.next_id()),
            storage_root_id: request.storage_root_id,
            old_path: request.old_path.clone(),
            new_path: request.new_path.clone(),
            is_directory: request.is_directory,
            size: request.size,
            file_hash: request.file_hash.clone(),
            detected_at: request.detected_at,
            processed_at: Some(Utc::now()),
            status,
        };
        self.rename_events.push(event.clone());
        event
    }

    fn apply_move(&mut self, request: &MoveRequest) -> Result<()> {
        if self.fail_moves {
            return Err(CatalogError::Internal("move rewrite refused".into()));
        }
        if !self.files.contains_key(&request.file_id.get()) {
            return Err(CatalogError::NotFound(format!("file {}", request.file_id)));
        }
        if let Some(occupant) = self.file_at(request.storage_root_id, &request.new_path)
            && occupant.id != request.file_id
        {
            return Err(CatalogError::InvalidInput(format!(
                "path {} already catalogued",
                request.new_path
            )));
        }

        let parent_id = paths::parent(&request.new_path).and_then(|parent| {
            self.file_at(request.storage_root_id, parent)
                .filter(|dir| dir.is_directory && !dir.deleted)
                .map(|dir| dir.id)
        });
        let now = Utc::now();

        if request.is_directory {
            for file in self.files.values_mut() {
                if file.storage_root_id != request.storage_root_id || file.id == request.file_id {
                    continue;
                }
                if file.path.len() > request.old_path.len()
                    && let Some(rebased) =
                        paths::rebase(&file.path, &request.old_path, &request.new_path)
                {
                    file.path = rebased;
                    // Tombstones older than this deletion stay buried.
                    let earlier = file.deleted_at.is_some_and(|at| at < request.deleted_at);
                    if !(file.deleted && earlier) {
                        file.deleted = false;
                        file.deleted_at = None;
                    }
                }
            }
        }

        if let Some(file) = self.files.get_mut(&request.file_id.get()) {
            file.path = request.new_path.clone();
            file.name = paths::file_name(&request.new_path).to_string();
            file.parent_id = parent_id;
            file.deleted = false;
            file.deleted_at = None;
            file.last_scan_at = now;
        }
        Ok(())
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCatalog {
    /// Empty catalog with the media types seeded.
    pub fn new() -> Self {
        let mut state = CatalogState::default();
        for kind in MediaKind::ALL {
            let id = MediaTypeId(state.next_id());
            state.media_types.push((id, kind.as_str().to_string()));
        }
        Self {
            state: Mutex::new(state),
        }
    }

    /// Make every subsequent move rewrite fail.
    pub async fn fail_moves(&self, fail: bool) {
        self.state.lock().await.fail_moves = fail;
    }

    /// Every record of a root (deleted included), ordered by path.
    pub async fn files(&self, root_id: StorageRootId) -> Vec<FileRecord> {
        let state = self.state.lock().await;
        let mut files: Vec<FileRecord> = state
            .files
            .values()
            .filter(|file| file.storage_root_id == root_id)
            .cloned()
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    /// Insert a record directly, bypassing the writer.
    pub async fn seed_file(&self, record: NewFileRecord) -> FileId {
        let mut state = self.state.lock().await;
        let id = FileId(state.next_id());
        state.files.insert(id.get(), materialize(id, record));
        id
    }

    pub async fn media_items(&self) -> Vec<MediaItem> {
        self.state.lock().await.media_items.clone()
    }

    pub async fn analyses(&self) -> Vec<DirectoryAnalysis> {
        self.state.lock().await.analyses.clone()
    }
}

fn materialize(id: FileId, record: NewFileRecord) -> FileRecord {
    FileRecord {
        id,
        storage_root_id: record.storage_root_id,
        path: record.path,
        name: record.name,
        extension: record.extension,
        mime_type: record.mime_type,
        file_type: record.file_type,
        size: record.size,
        is_directory: record.is_directory,
        parent_id: record.parent_id,
        quick_hash: record.quick_hash,
        modified_at: record.modified_at,
        last_scan_at: record.last_scan_at,
        deleted: false,
        deleted_at: None,
    }
}

#[async_trait]
impl StorageRootRepository for InMemoryCatalog {
    async fn get_by_name(&self, name: &str) -> Result<Option<StorageRoot>> {
        let state = self.state.lock().await;
        Ok(state.roots.iter().find(|root| root.name == name).cloned())
    }

    async fn insert_if_absent(&self, root: &StorageRoot) -> Result<Option<StorageRootId>> {
        let mut state = self.state.lock().await;
        if state.roots.iter().any(|existing| existing.name == root.name) {
            return Ok(None);
        }
        let id = StorageRootId(state.next_id());
        let mut stored = root.clone();
        stored.id = Some(id);
        state.roots.push(stored);
        Ok(Some(id))
    }

    async fn save(&self, root: &StorageRoot) -> Result<StorageRootId> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state.roots.iter_mut().find(|r| r.name == root.name) {
            let id = existing.id.unwrap_or(StorageRootId(0));
            *existing = root.clone();
            existing.id = Some(id);
            return Ok(id);
        }
        let id = StorageRootId(state.next_id());
        let mut stored = root.clone();
        stored.id = Some(id);
        state.roots.push(stored);
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<StorageRoot>> {
        let mut roots = self.state.lock().await.roots.clone();
        roots.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roots)
    }
}

#[async_trait]
impl FileRepository for InMemoryCatalog {
    async fn get_by_path(
        &self,
        root_id: StorageRootId,
        path: &str,
    ) -> Result<Option<FileRecord>> {
        Ok(self.state.lock().await.file_at(root_id, path).cloned())
    }

    async fn find_directory_id(
        &self,
        root_id: StorageRootId,
        path: &str,
    ) -> Result<Option<FileId>> {
        let state = self.state.lock().await;
        Ok(state
            .file_at(root_id, path)
            .filter(|file| file.is_directory && !file.deleted)
            .map(|file| file.id))
    }

    async fn upsert(&self, record: &NewFileRecord) -> Result<UpsertOutcome> {
        let mut state = self.state.lock().await;
        let existing = state
            .file_at(record.storage_root_id, &record.path)
            .map(|file| file.id);

        match existing {
            Some(id) => {
                if let Some(file) = state.files.get_mut(&id.get()) {
                    let quick_hash = record.quick_hash.clone().or(file.quick_hash.take());
                    *file = materialize(id, record.clone());
                    file.quick_hash = quick_hash;
                }
                Ok(UpsertOutcome {
                    id,
                    inserted: false,
                })
            }
            None => {
                let id = FileId(state.next_id());
                state.files.insert(id.get(), materialize(id, record.clone()));
                Ok(UpsertOutcome { id, inserted: true })
            }
        }
    }

    async fn list_children(&self, root_id: StorageRootId, dir: &str) -> Result<Vec<FileRecord>> {
        let dir = match dir.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        let state = self.state.lock().await;
        let mut children: Vec<FileRecord> = state
            .files
            .values()
            .filter(|file| {
                file.storage_root_id == root_id
                    && !file.deleted
                    && paths::parent(&file.path) == Some(dir)
            })
            .cloned()
            .collect();
        children.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(children)
    }

    async fn list_subtree(&self, root_id: StorageRootId, path: &str) -> Result<Vec<FileRecord>> {
        let state = self.state.lock().await;
        let mut subtree: Vec<FileRecord> = state
            .files
            .values()
            .filter(|file| {
                file.storage_root_id == root_id
                    && !file.deleted
                    && paths::is_within(&file.path, path)
            })
            .cloned()
            .collect();
        subtree.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(subtree)
    }

    async fn mark_deleted(&self, ids: &[FileId], at: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state.lock().await;
        let mut affected = 0;
        for id in ids {
            if let Some(file) = state.files.get_mut(&id.get())
                && !file.deleted
            {
                file.deleted = true;
                file.deleted_at = Some(at);
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn top_level_directories(&self, root_id: StorageRootId) -> Result<Vec<FileRecord>> {
        let state = self.state.lock().await;
        let mut dirs: Vec<FileRecord> = state
            .files
            .values()
            .filter(|file| {
                file.storage_root_id == root_id
                    && file.is_directory
                    && !file.deleted
                    && file.parent_id.is_none()
            })
            .cloned()
            .collect();
        dirs.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(dirs)
    }

    async fn child_files(&self, parent_id: FileId) -> Result<Vec<FileRecord>> {
        let state = self.state.lock().await;
        let mut children: Vec<FileRecord> = state
            .files
            .values()
            .filter(|file| {
                file.parent_id == Some(parent_id) && !file.is_directory && !file.deleted
            })
            .cloned()
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }

    async fn count(&self, root_id: StorageRootId) -> Result<i64> {
        let state = self.state.lock().await;
        Ok(state
            .files
            .values()
            .filter(|file| file.storage_root_id == root_id)
            .count() as i64)
    }
}

#[async_trait]
impl RenameEventRepository for InMemoryCatalog {
    async fn record_move(&self, request: &MoveRequest) -> Result<RenameEvent> {
        let mut state = self.state.lock().await;
        match state.apply_move(request) {
            Ok(()) => Ok(state.push_event(request, RenameStatus::Processed)),
            Err(err) => {
                state.push_event(request, RenameStatus::Failed);
                Err(err)
            }
        }
    }

    async fn counts(&self) -> Result<RenameCounts> {
        let state = self.state.lock().await;
        let mut counts = RenameCounts::default();
        for event in &state.rename_events {
            counts.total += 1;
            match event.status {
                RenameStatus::Processed => counts.processed += 1,
                RenameStatus::Failed => counts.failed += 1,
                RenameStatus::Pending => {}
            }
        }
        Ok(counts)
    }

    async fn recent(
        &self,
        root_id: Option<StorageRootId>,
        limit: i64,
    ) -> Result<Vec<RenameEvent>> {
        let state = self.state.lock().await;
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(state
            .rename_events
            .iter()
            .rev()
            .filter(|event| root_id.is_none_or(|id| event.storage_root_id == id))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MediaItemRepository for InMemoryCatalog {
    async fn get_media_type_by_name(&self, name: &str) -> Result<MediaTypeId> {
        let state = self.state.lock().await;
        state
            .media_types
            .iter()
            .find(|(_, type_name)| type_name == name)
            .map(|(id, _)| *id)
            .ok_or_else(|| CatalogError::NotFound(format!("media type '{name}'")))
    }

    async fn get_by_title(
        &self,
        title: &str,
        media_type_id: MediaTypeId,
    ) -> Result<Option<MediaItem>> {
        let state = self.state.lock().await;
        Ok(state
            .media_items
            .iter()
            .find(|item| item.title == title && item.media_type_id == media_type_id)
            .cloned())
    }

    async fn get_child_by_title(
        &self,
        parent_id: MediaItemId,
        title: &str,
        media_type_id: MediaTypeId,
    ) -> Result<Option<MediaItem>> {
        let state = self.state.lock().await;
        Ok(state
            .media_items
            .iter()
            .find(|item| {
                item.parent_id == Some(parent_id)
                    && item.title == title
                    && item.media_type_id == media_type_id
            })
            .cloned())
    }

    async fn create(&self, item: &NewMediaItem) -> Result<MediaItem> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let created = MediaItem {
            id: MediaItemId(state.next_id()),
            media_type_id: item.media_type_id,
            title: item.title.clone(),
            year: item.year,
            parent_id: item.parent_id,
            season_number: item.season_number,
            episode_number: item.episode_number,
            status: item.status.clone(),
            created_at: now,
            updated_at: now,
        };
        state.media_items.push(created.clone());
        Ok(created)
    }

    async fn update(&self, item: &MediaItem) -> Result<()> {
        let mut state = self.state.lock().await;
        let stored = state
            .media_items
            .iter_mut()
            .find(|existing| existing.id == item.id)
            .ok_or_else(|| CatalogError::NotFound(format!("media item {}", item.id)))?;
        *stored = item.clone();
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn list_child_items(&self, parent_id: MediaItemId) -> Result<Vec<MediaItem>> {
        let state = self.state.lock().await;
        Ok(state
            .media_items
            .iter()
            .filter(|item| item.parent_id == Some(parent_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl FileLinkRepository for InMemoryCatalog {
    async fn link_file_to_item(
        &self,
        media_item_id: MediaItemId,
        file_id: FileId,
        is_primary: bool,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        match state
            .links
            .iter_mut()
            .find(|link| link.media_item_id == media_item_id && link.file_id == file_id)
        {
            Some(link) => link.is_primary = is_primary,
            None => state.links.push(MediaFileLink {
                media_item_id,
                file_id,
                is_primary,
            }),
        }
        Ok(())
    }

    async fn links_for_item(&self, media_item_id: MediaItemId) -> Result<Vec<MediaFileLink>> {
        let state = self.state.lock().await;
        let mut links: Vec<MediaFileLink> = state
            .links
            .iter()
            .filter(|link| link.media_item_id == media_item_id)
            .copied()
            .collect();
        links.sort_by_key(|link| (!link.is_primary, link.file_id));
        Ok(links)
    }
}

#[async_trait]
impl DirectoryAnalysisRepository for InMemoryCatalog {
    async fn get_by_path(&self, directory_path: &str) -> Result<Option<DirectoryAnalysis>> {
        let state = self.state.lock().await;
        Ok(state
            .analyses
            .iter()
            .find(|analysis| analysis.directory_path == directory_path)
            .cloned())
    }

    async fn create(&self, analysis: &DirectoryAnalysis) -> Result<i64> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state
            .analyses
            .iter_mut()
            .find(|existing| existing.directory_path == analysis.directory_path)
        {
            let id = existing.id;
            *existing = analysis.clone();
            existing.id = id;
            return Ok(id);
        }
        let id = state.next_id();
        let mut stored = analysis.clone();
        stored.id = id;
        state.analyses.push(stored);
        Ok(id)
    }

    async fn update(&self, analysis: &DirectoryAnalysis) -> Result<()> {
        let mut state = self.state.lock().await;
        let stored = state
            .analyses
            .iter_mut()
            .find(|existing| existing.id == analysis.id)
            .ok_or_else(|| {
                CatalogError::NotFound(format!("directory analysis {}", analysis.id))
            })?;
        *stored = analysis.clone();
        Ok(())
    }
}
