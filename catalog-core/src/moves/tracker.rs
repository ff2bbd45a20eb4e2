use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use catalog_model::{FileId, Protocol, RenameEvent, StorageRootId};
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::MoveTrackerConfig;
use crate::database::ports::{MoveRequest, RenameEventRepository};
use crate::error::Result;
use crate::paths;

/// Identity of a file for move pairing.
///
/// Any differing field yields a different key. Without a fingerprint two
/// unrelated files of equal size collide, as do identical empty directories.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MoveKey {
    pub storage_root: String,
    pub fingerprint: Option<String>,
    pub size: i64,
    pub is_directory: bool,
}

impl fmt::Display for MoveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.storage_root,
            self.fingerprint.as_deref().unwrap_or("nil"),
            self.size,
            self.is_directory
        )
    }
}

/// A path observed on one side of a potential move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveCandidate {
    pub storage_root: String,
    pub storage_root_id: StorageRootId,
    pub protocol: Protocol,
    pub path: String,
    pub size: i64,
    pub fingerprint: Option<String>,
    pub is_directory: bool,
}

impl MoveCandidate {
    pub fn key(&self) -> MoveKey {
        MoveKey {
            storage_root: self.storage_root.clone(),
            fingerprint: self.fingerprint.clone(),
            size: self.size,
            is_directory: self.is_directory,
        }
    }
}

/// A deletion waiting for a matching creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMove {
    pub key: MoveKey,
    pub path: String,
    pub storage_root: String,
    pub storage_root_id: StorageRootId,
    pub protocol: Protocol,
    pub size: i64,
    pub fingerprint: Option<String>,
    pub is_directory: bool,
    pub file_id: FileId,
    pub deleted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveStatistics {
    pub pending_moves: usize,
    pub total_renames: i64,
    pub successful_renames: i64,
    pub failed_renames: i64,
    /// Percentage of recorded renames that were applied; 0 with no history.
    pub success_rate: f64,
}

pub(crate) fn success_rate(successful: i64, total: i64) -> f64 {
    if total <= 0 {
        0.0
    } else {
        successful as f64 / total as f64 * 100.0
    }
}

struct Sweeper {
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct MoveTracker {
    config: MoveTrackerConfig,
    pending: RwLock<HashMap<MoveKey, PendingMove>>,
    renames: Arc<dyn RenameEventRepository>,
    sweeper: Mutex<Option<Sweeper>>,
}

impl fmt::Debug for MoveTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("MoveTracker");
        debug.field("config", &self.config);
        match self.pending.try_read() {
            Ok(pending) => {
                debug.field("pending", &pending.len());
            }
            Err(_) => {
                debug.field("pending", &"<locked>");
            }
        }
        debug.finish()
    }
}

impl MoveTracker {
    pub fn new(config: MoveTrackerConfig, renames: Arc<dyn RenameEventRepository>) -> Self {
        Self {
            config,
            pending: RwLock::new(HashMap::new()),
            renames,
            sweeper: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &MoveTrackerConfig {
        &self.config
    }

    /// Park a deletion. A deletion with an identical key replaces the earlier one.
    pub async fn track_delete(&self, deleted: MoveCandidate, file_id: FileId) -> MoveKey {
        self.track_delete_at(deleted, file_id, Utc::now()).await
    }

    pub async fn track_delete_at(
        &self,
        deleted: MoveCandidate,
        file_id: FileId,
        deleted_at: DateTime<Utc>,
    ) -> MoveKey {
        let key = deleted.key();
        let pending = PendingMove {
            key: key.clone(),
            path: deleted.path,
            storage_root: deleted.storage_root,
            storage_root_id: deleted.storage_root_id,
            protocol: deleted.protocol,
            size: deleted.size,
            fingerprint: deleted.fingerprint,
            is_directory: deleted.is_directory,
            file_id,
            deleted_at,
        };

        let mut table = self.pending.write().await;
        if !table.contains_key(&key) && table.len() >= self.config.max_pending_moves.max(1) {
            let oldest = table
                .values()
                .min_by_key(|entry| entry.deleted_at)
                .map(|entry| entry.key.clone());
            if let Some(oldest) = oldest {
                table.remove(&oldest);
                warn!(
                    evicted = %oldest,
                    limit = self.config.max_pending_moves,
                    "pending move table full, evicted oldest deletion"
                );
            }
        }
        if let Some(previous) = table.insert(key.clone(), pending) {
            debug!(key = %key, replaced = %previous.path, "pending move overwritten");
        }
        debug!(key = %key, "tracking deletion");
        key
    }

    /// Pair a creation with a parked deletion, consuming it.
    pub async fn detect_create(&self, created: &MoveCandidate) -> Option<PendingMove> {
        self.detect_create_at(created, Utc::now()).await
    }

    pub async fn detect_create_at(
        &self,
        created: &MoveCandidate,
        now: DateTime<Utc>,
    ) -> Option<PendingMove> {
        let key = created.key();
        let pending = self.pending.write().await.remove(&key)?;

        if now - pending.deleted_at > self.config.window_for(pending.protocol) {
            debug!(key = %key, "pending move expired before matching create");
            return None;
        }
        if pending.path == created.path {
            // Reappeared in place: the deletion is void, so the entry is
            // discarded rather than left to pair with a later creation.
            debug!(key = %key, path = %created.path, "deleted path reappeared");
            return None;
        }

        info!(
            storage_root = %created.storage_root,
            old_path = %pending.path,
            new_path = %created.path,
            "detected move"
        );
        Some(pending)
    }

    /// Apply a matched move to the catalog and record its audit event.
    pub async fn process_move(&self, pending: &PendingMove, new_path: &str) -> Result<RenameEvent> {
        let request = MoveRequest {
            storage_root_id: pending.storage_root_id,
            file_id: pending.file_id,
            old_path: pending.path.clone(),
            new_path: new_path.to_string(),
            is_directory: pending.is_directory,
            size: pending.size,
            file_hash: pending.fingerprint.clone(),
            deleted_at: pending.deleted_at,
            detected_at: Utc::now(),
        };

        let event = self.renames.record_move(&request).await?;

        if pending.is_directory {
            let dropped = self
                .forget_descendants(&pending.storage_root, &pending.path)
                .await;
            if dropped > 0 {
                debug!(
                    old_path = %pending.path,
                    dropped,
                    "dropped pending deletions covered by directory move"
                );
            }
        }
        Ok(event)
    }

    /// Remove parked deletions below `dir`; the directory move already
    /// relocated those records.
    async fn forget_descendants(&self, storage_root: &str, dir: &str) -> usize {
        let mut table = self.pending.write().await;
        let before = table.len();
        table.retain(|_, entry| {
            entry.storage_root != storage_root
                || entry.path == dir
                || !paths::is_within(&entry.path, dir)
        });
        before - table.len()
    }

    /// Drop every deletion older than its window. Returns how many expired.
    pub async fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Utc::now()).await
    }

    pub async fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut table = self.pending.write().await;
        let before = table.len();
        table.retain(|_, entry| now - entry.deleted_at <= self.config.window_for(entry.protocol));
        let expired = before - table.len();
        if expired > 0 {
            debug!(expired, remaining = table.len(), "swept expired pending moves");
        }
        expired
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.read().await.len()
    }

    pub async fn is_pending(&self, key: &MoveKey) -> bool {
        self.pending.read().await.contains_key(key)
    }

    pub async fn statistics(&self) -> Result<MoveStatistics> {
        let pending_moves = self.pending_count().await;
        let counts = self.renames.counts().await?;
        Ok(MoveStatistics {
            pending_moves,
            total_renames: counts.total,
            successful_renames: counts.processed,
            failed_renames: counts.failed,
            success_rate: success_rate(counts.processed, counts.total),
        })
    }

    /// Audit trail, newest first.
    pub async fn recent_rename_events(
        &self,
        storage_root_id: Option<StorageRootId>,
        limit: i64,
    ) -> Result<Vec<RenameEvent>> {
        self.renames.recent(storage_root_id, limit).await
    }

    /// Start the periodic sweep. A second call while running is a no-op.
    pub async fn start_sweeper(self: &Arc<Self>) {
        let mut slot = self.sweeper.lock().await;
        if slot.is_some() {
            return;
        }

        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let tracker = Arc::clone(self);
        let period = self.config.cleanup_interval();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        tracker.sweep_expired().await;
                    }
                }
            }
            debug!("move tracker sweeper stopped");
        });

        *slot = Some(Sweeper { shutdown, handle });
    }

    pub async fn stop_sweeper(&self) {
        let sweeper = self.sweeper.lock().await.take();
        if let Some(Sweeper { shutdown, handle }) = sweeper {
            shutdown.cancel();
            if let Err(err) = handle.await {
                warn!(error = %err, "move tracker sweeper task failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::InMemoryCatalog;

    fn candidate(path: &str, hash: Option<&str>, size: i64, is_directory: bool) -> MoveCandidate {
        MoveCandidate {
            storage_root: "root".into(),
            storage_root_id: StorageRootId(1),
            protocol: Protocol::Local,
            path: path.into(),
            size,
            fingerprint: hash.map(str::to_string),
            is_directory,
        }
    }

    fn tracker() -> MoveTracker {
        MoveTracker::new(
            MoveTrackerConfig::default(),
            Arc::new(InMemoryCatalog::new()),
        )
    }

    #[test]
    fn key_is_deterministic_and_field_sensitive() {
        let base = candidate("/a.txt", Some("h1"), 1024, false);
        assert_eq!(base.key(), candidate("/elsewhere", Some("h1"), 1024, false).key());
        assert_eq!(base.key().to_string(), "root:h1:1024:false");

        assert_ne!(base.key(), candidate("/a.txt", Some("h2"), 1024, false).key());
        assert_ne!(base.key(), candidate("/a.txt", Some("h1"), 1025, false).key());
        assert_ne!(base.key(), candidate("/a.txt", Some("h1"), 1024, true).key());
        assert_ne!(base.key(), candidate("/a.txt", None, 1024, false).key());

        let mut other_root = candidate("/a.txt", Some("h1"), 1024, false);
        other_root.storage_root = "other".into();
        assert_ne!(base.key(), other_root.key());
    }

    #[test]
    fn missing_fingerprint_renders_nil() {
        assert_eq!(candidate("/x", None, 7, true).key().to_string(), "root:nil:7:true");
    }

    #[test]
    fn success_rate_handles_empty_history() {
        assert_eq!(success_rate(0, 0), 0.0);
        assert!((success_rate(2, 3) - 66.666).abs() < 0.01);
    }

    #[tokio::test]
    async fn create_within_window_matches_and_consumes() {
        let tracker = tracker();
        let key = tracker
            .track_delete(candidate("/a.txt", Some("h1"), 1024, false), FileId(9))
            .await;

        let matched = tracker
            .detect_create(&candidate("/b.txt", Some("h1"), 1024, false))
            .await
            .expect("move detected");
        assert_eq!(matched.path, "/a.txt");
        assert_eq!(matched.file_id, FileId(9));
        assert!(!tracker.is_pending(&key).await);
    }

    #[tokio::test]
    async fn create_after_window_does_not_match() {
        let tracker = tracker();
        let deleted_at = Utc::now();
        let key = tracker
            .track_delete_at(candidate("/a.txt", Some("h1"), 1024, false), FileId(9), deleted_at)
            .await;

        let later = deleted_at + chrono::Duration::seconds(6);
        let matched = tracker
            .detect_create_at(&candidate("/b.txt", Some("h1"), 1024, false), later)
            .await;
        assert!(matched.is_none());
        assert!(!tracker.is_pending(&key).await);
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_entries() {
        let tracker = tracker();
        let now = Utc::now();
        tracker
            .track_delete_at(
                candidate("/old", Some("h1"), 1, false),
                FileId(1),
                now - chrono::Duration::seconds(10),
            )
            .await;
        let fresh = tracker
            .track_delete_at(candidate("/new", Some("h2"), 1, false), FileId(2), now)
            .await;

        assert_eq!(tracker.sweep_expired_at(now).await, 1);
        assert_eq!(tracker.pending_count().await, 1);
        assert!(tracker.is_pending(&fresh).await);
    }

    #[tokio::test]
    async fn identical_keys_overwrite() {
        let tracker = tracker();
        tracker
            .track_delete(candidate("/first", Some("h"), 5, false), FileId(1))
            .await;
        tracker
            .track_delete(candidate("/second", Some("h"), 5, false), FileId(2))
            .await;
        assert_eq!(tracker.pending_count().await, 1);

        let matched = tracker
            .detect_create(&candidate("/third", Some("h"), 5, false))
            .await
            .expect("match");
        assert_eq!(matched.path, "/second");
    }

    #[tokio::test]
    async fn full_table_evicts_oldest() {
        let config = MoveTrackerConfig {
            max_pending_moves: 2,
            ..MoveTrackerConfig::default()
        };
        let tracker = MoveTracker::new(config, Arc::new(InMemoryCatalog::new()));
        let now = Utc::now();
        let oldest = tracker
            .track_delete_at(
                candidate("/a", Some("a"), 1, false),
                FileId(1),
                now - chrono::Duration::seconds(2),
            )
            .await;
        tracker
            .track_delete_at(
                candidate("/b", Some("b"), 1, false),
                FileId(2),
                now - chrono::Duration::seconds(1),
            )
            .await;
        tracker
            .track_delete_at(candidate("/c", Some("c"), 1, false), FileId(3), now)
            .await;

        assert_eq!(tracker.pending_count().await, 2);
        assert!(!tracker.is_pending(&oldest).await);
    }

    #[tokio::test]
    async fn same_path_reappearing_is_not_a_move() {
        let tracker = tracker();
        let key = tracker
            .track_delete(candidate("/a.txt", Some("h"), 3, false), FileId(1))
            .await;
        assert!(
            tracker
                .detect_create(&candidate("/a.txt", Some("h"), 3, false))
                .await
                .is_none()
        );
        assert!(!tracker.is_pending(&key).await);

        // A copy created elsewhere afterwards must not move the live record.
        assert!(
            tracker
                .detect_create(&candidate("/copy.txt", Some("h"), 3, false))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn sweeper_starts_and_stops() {
        let config = MoveTrackerConfig {
            cleanup_interval_ms: 10,
            move_window_ms: 0,
            ..MoveTrackerConfig::default()
        };
        let tracker = Arc::new(MoveTracker::new(config, Arc::new(InMemoryCatalog::new())));
        tracker
            .track_delete_at(
                candidate("/gone", None, 1, false),
                FileId(1),
                Utc::now() - chrono::Duration::seconds(1),
            )
            .await;

        tracker.start_sweeper().await;
        for _ in 0..100 {
            if tracker.pending_count().await == 0 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        tracker.stop_sweeper().await;
        assert_eq!(tracker.pending_count().await, 0);
    }
}
