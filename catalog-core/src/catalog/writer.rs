use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use catalog_model::{FileRecord, FileType, NewFileRecord, StorageRoot, StorageRootId};
use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, warn};

use super::classify::classify_extension;
use crate::database::{CatalogRepositories, FileRepository, StorageRootRepository};
use crate::error::{CatalogError, Result};
use crate::fs::RemoteFileInfo;
use crate::moves::{MoveCandidate, MoveTracker};
use crate::paths;
use crate::scan::{ScanCounters, ScanStatus};

/// What an upsert did to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Inserted,
    Updated,
    Unchanged,
    /// The path was matched to a recently deleted record and relocated.
    Moved,
}

/// Records scan observations in the catalog.
///
/// Every write is an upsert on `(storage_root_id, path)`, so rescanning an
/// unchanged tree touches `last_scan_at` and nothing else.
pub struct CatalogWriter {
    storage_roots: Arc<dyn StorageRootRepository>,
    files: Arc<dyn FileRepository>,
    tracker: Arc<MoveTracker>,
    root_ids: DashMap<String, StorageRootId>,
}

impl fmt::Debug for CatalogWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogWriter")
            .field("tracker", &self.tracker)
            .field("cached_roots", &self.root_ids.len())
            .finish()
    }
}

impl CatalogWriter {
    pub fn new(repositories: &CatalogRepositories, tracker: Arc<MoveTracker>) -> Self {
        Self {
            storage_roots: Arc::clone(&repositories.storage_roots),
            files: Arc::clone(&repositories.files),
            tracker,
            root_ids: DashMap::new(),
        }
    }

    pub fn tracker(&self) -> &Arc<MoveTracker> {
        &self.tracker
    }

    /// Id of the root's row, creating the row on first use.
    pub async fn resolve_storage_root(&self, root: &StorageRoot) -> Result<StorageRootId> {
        if let Some(id) = root.id {
            return Ok(id);
        }
        if let Some(id) = self.root_ids.get(&root.name) {
            return Ok(*id);
        }

        let id = match self.storage_roots.get_by_name(&root.name).await? {
            Some(existing) => existing.id,
            None => match self.storage_roots.insert_if_absent(root).await? {
                Some(id) => Some(id),
                // Lost the insert race; the winner's row is there now.
                None => self
                    .storage_roots
                    .get_by_name(&root.name)
                    .await?
                    .and_then(|existing| existing.id),
            },
        }
        .ok_or_else(|| {
            CatalogError::Internal(format!("storage root {} could not be resolved", root.name))
        })?;

        self.root_ids.insert(root.name.clone(), id);
        Ok(id)
    }

    /// Upsert the record for one listed entry and bump the job counters.
    pub async fn insert_file_record(
        &self,
        root: &StorageRoot,
        path: &str,
        info: &RemoteFileInfo,
        fingerprint: Option<String>,
        status: &ScanStatus,
    ) -> Result<WriteOutcome> {
        let root_id = self.resolve_storage_root(root).await?;
        let size = i64::try_from(info.size).unwrap_or(i64::MAX);
        let existing = self.files.get_by_path(root_id, path).await?;

        let mut moved = false;
        if existing.is_none() {
            let candidate = MoveCandidate {
                storage_root: root.name.clone(),
                storage_root_id: root_id,
                protocol: root.protocol,
                path: path.to_string(),
                size,
                fingerprint: fingerprint.clone(),
                is_directory: info.is_dir,
            };
            if let Some(pending) = self.tracker.detect_create(&candidate).await {
                match self.tracker.process_move(&pending, path).await {
                    Ok(_) => moved = true,
                    Err(err) => {
                        warn!(
                            storage_root = %root.name,
                            old_path = %pending.path,
                            new_path = %path,
                            error = %err,
                            "move could not be applied, recording as new file"
                        );
                        status.record_error();
                    }
                }
            }
        }

        let name = paths::file_name(path).to_string();
        let (extension, mime_type, file_type) = if info.is_dir {
            (None, None, FileType::Directory)
        } else {
            let extension = paths::extension(&name);
            let (mime, file_type) = extension
                .as_deref()
                .map(classify_extension)
                .unwrap_or((None, FileType::Other));
            (extension, mime.map(str::to_string), file_type)
        };

        let parent_id = match paths::parent(path) {
            Some(parent) => self.files.find_directory_id(root_id, parent).await?,
            None => None,
        };

        let record = NewFileRecord {
            storage_root_id: root_id,
            path: path.to_string(),
            name,
            extension,
            mime_type,
            file_type,
            size,
            is_directory: info.is_dir,
            parent_id,
            quick_hash: fingerprint,
            modified_at: info.modified,
            last_scan_at: Utc::now(),
        };
        let upserted = self.files.upsert(&record).await?;

        let outcome = if upserted.inserted {
            WriteOutcome::Inserted
        } else if moved {
            WriteOutcome::Moved
        } else if existing.as_ref().is_some_and(|prior| changed(prior, &record)) {
            WriteOutcome::Updated
        } else {
            WriteOutcome::Unchanged
        };

        status.increment(ScanCounters {
            processed: 1,
            found: 1,
            updated: u64::from(matches!(outcome, WriteOutcome::Updated | WriteOutcome::Moved)),
            ..ScanCounters::default()
        });
        Ok(outcome)
    }

    /// Soft-delete catalogued children of `dir` that the listing no longer
    /// contains. `present` holds every name the listing returned.
    pub async fn reconcile_directory(
        &self,
        root: &StorageRoot,
        dir: &str,
        present: &HashSet<String>,
        status: &ScanStatus,
    ) -> Result<u64> {
        let root_id = self.resolve_storage_root(root).await?;
        let children = self.files.list_children(root_id, dir).await?;

        let mut deleted = 0;
        for child in children {
            if present.contains(&child.name) {
                continue;
            }
            deleted += self.delete_subtree(root, root_id, &child).await?;
        }

        if deleted > 0 {
            status.increment(ScanCounters {
                deleted,
                ..ScanCounters::default()
            });
        }
        Ok(deleted)
    }

    /// Soft-delete `path` and everything under it, as reported by a change
    /// notification rather than a listing.
    pub async fn record_deletion(&self, root: &StorageRoot, path: &str) -> Result<u64> {
        let root_id = self.resolve_storage_root(root).await?;
        match self.files.get_by_path(root_id, path).await? {
            Some(record) if !record.deleted => self.delete_subtree(root, root_id, &record).await,
            _ => Ok(0),
        }
    }

    async fn delete_subtree(
        &self,
        root: &StorageRoot,
        root_id: StorageRootId,
        record: &FileRecord,
    ) -> Result<u64> {
        let doomed = if record.is_directory {
            self.files.list_subtree(root_id, &record.path).await?
        } else {
            vec![record.clone()]
        };
        let ids: Vec<_> = doomed.iter().map(|file| file.id).collect();
        let deleted_at = Utc::now();
        let affected = self.files.mark_deleted(&ids, deleted_at).await?;

        for file in doomed {
            let candidate = MoveCandidate {
                storage_root: root.name.clone(),
                storage_root_id: root_id,
                protocol: root.protocol,
                path: file.path,
                size: file.size,
                fingerprint: file.quick_hash,
                is_directory: file.is_directory,
            };
            self.tracker
                .track_delete_at(candidate, file.id, deleted_at)
                .await;
        }

        debug!(
            storage_root = %root.name,
            path = %record.path,
            affected,
            "marked deleted"
        );
        Ok(affected)
    }
}

fn changed(prior: &FileRecord, next: &NewFileRecord) -> bool {
    prior.deleted
        || prior.size != next.size
        || prior.is_directory != next.is_directory
        || (next.modified_at.is_some() && prior.modified_at != next.modified_at)
}
