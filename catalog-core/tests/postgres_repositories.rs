#![cfg(feature = "postgres-tests")]

use catalog_core::database::{CatalogRepositories, MoveRequest};
use catalog_model::{
    DirectoryAnalysis, FileId, FileType, MediaKind, NewFileRecord, NewMediaItem, RenameStatus,
    StorageRoot, StorageRootId,
};
use chrono::Utc;
use sqlx::PgPool;

async fn seed_root(repos: &CatalogRepositories) -> anyhow::Result<StorageRootId> {
    let root = StorageRoot::local("media", "/srv/media");
    let id = repos.storage_roots.save(&root).await?;
    Ok(id)
}

fn record(root: StorageRootId, path: &str, is_directory: bool) -> NewFileRecord {
    let name = path.rsplit('/').next().unwrap_or(path).to_string();
    NewFileRecord {
        storage_root_id: root,
        path: path.to_string(),
        name,
        extension: None,
        mime_type: None,
        file_type: if is_directory {
            FileType::Directory
        } else {
            FileType::Other
        },
        size: if is_directory { 0 } else { 42 },
        is_directory,
        parent_id: None,
        quick_hash: None,
        modified_at: None,
        last_scan_at: Utc::now(),
    }
}

fn move_request(
    root: StorageRootId,
    file_id: FileId,
    old_path: &str,
    new_path: &str,
    is_directory: bool,
) -> MoveRequest {
    MoveRequest {
        storage_root_id: root,
        file_id,
        old_path: old_path.to_string(),
        new_path: new_path.to_string(),
        is_directory,
        size: 0,
        file_hash: None,
        deleted_at: Utc::now(),
        detected_at: Utc::now(),
    }
}

#[sqlx::test(migrator = "catalog_core::MIGRATOR")]
async fn storage_root_insert_if_absent_keeps_the_first_row(pool: PgPool) -> anyhow::Result<()> {
    let repos = CatalogRepositories::postgres(pool);
    let root = StorageRoot::local("media", "/srv/media");

    let first = repos.storage_roots.insert_if_absent(&root).await?;
    assert!(first.is_some());
    let second = repos.storage_roots.insert_if_absent(&root).await?;
    assert_eq!(second, None);

    let stored = repos
        .storage_roots
        .get_by_name("media")
        .await?
        .expect("root should exist");
    assert_eq!(stored.id, first);
    assert_eq!(stored.path.as_deref(), Some("/srv/media"));
    assert_eq!(repos.storage_roots.list().await?.len(), 1);
    Ok(())
}

#[sqlx::test(migrator = "catalog_core::MIGRATOR")]
async fn file_upsert_reports_insert_only_once(pool: PgPool) -> anyhow::Result<()> {
    let repos = CatalogRepositories::postgres(pool);
    let root = seed_root(&repos).await?;

    let first = repos.files.upsert(&record(root, "/movies/a.mkv", false)).await?;
    let second = repos.files.upsert(&record(root, "/movies/a.mkv", false)).await?;

    assert!(first.inserted);
    assert!(!second.inserted);
    assert_eq!(first.id, second.id);
    assert_eq!(repos.files.count(root).await?, 1);
    Ok(())
}

#[sqlx::test(migrator = "catalog_core::MIGRATOR")]
async fn mark_deleted_hides_records_until_upserted_again(pool: PgPool) -> anyhow::Result<()> {
    let repos = CatalogRepositories::postgres(pool);
    let root = seed_root(&repos).await?;
    let file = repos.files.upsert(&record(root, "/a.txt", false)).await?;

    assert_eq!(repos.files.mark_deleted(&[file.id], Utc::now()).await?, 1);
    let stored = repos
        .files
        .get_by_path(root, "/a.txt")
        .await?
        .expect("deleted rows stay addressable by path");
    assert!(stored.deleted);
    assert!(repos.files.list_subtree(root, "/").await?.is_empty());

    repos.files.upsert(&record(root, "/a.txt", false)).await?;
    let revived = repos
        .files
        .get_by_path(root, "/a.txt")
        .await?
        .expect("record should exist");
    assert!(!revived.deleted);
    assert_eq!(revived.deleted_at, None);
    Ok(())
}

#[sqlx::test(migrator = "catalog_core::MIGRATOR")]
async fn directory_move_rewrites_descendants_atomically(pool: PgPool) -> anyhow::Result<()> {
    let repos = CatalogRepositories::postgres(pool);
    let root = seed_root(&repos).await?;

    let dir = repos.files.upsert(&record(root, "/old", true)).await?;
    repos.files.upsert(&record(root, "/old/a.mkv", false)).await?;
    repos.files.upsert(&record(root, "/old/sub", true)).await?;
    repos.files.upsert(&record(root, "/old/sub/b.mkv", false)).await?;
    repos.files.upsert(&record(root, "/older/c.mkv", false)).await?;

    let event = repos
        .rename_events
        .record_move(&move_request(root, dir.id, "/old", "/new", true))
        .await?;
    assert_eq!(event.status, RenameStatus::Processed);
    assert!(event.processed_at.is_some());

    let mut paths: Vec<String> = repos
        .files
        .list_subtree(root, "/")
        .await?
        .into_iter()
        .map(|file| file.path)
        .collect();
    paths.sort();
    assert_eq!(
        paths,
        vec![
            "/new".to_string(),
            "/new/a.mkv".to_string(),
            "/new/sub".to_string(),
            "/new/sub/b.mkv".to_string(),
            "/older/c.mkv".to_string(),
        ]
    );

    let counts = repos.rename_events.counts().await?;
    assert_eq!((counts.total, counts.processed, counts.failed), (1, 1, 0));
    Ok(())
}

#[sqlx::test(migrator = "catalog_core::MIGRATOR")]
async fn directory_move_keeps_older_tombstones_deleted(pool: PgPool) -> anyhow::Result<()> {
    let repos = CatalogRepositories::postgres(pool);
    let root = seed_root(&repos).await?;

    let dir = repos.files.upsert(&record(root, "/show", true)).await?;
    let keep = repos.files.upsert(&record(root, "/show/keep.mkv", false)).await?;
    let old = repos.files.upsert(&record(root, "/show/old.mkv", false)).await?;

    let long_ago = Utc::now() - chrono::Duration::hours(1);
    repos.files.mark_deleted(&[old.id], long_ago).await?;
    let deleted_at = Utc::now();
    repos.files.mark_deleted(&[dir.id, keep.id], deleted_at).await?;

    let mut request = move_request(root, dir.id, "/show", "/show2", true);
    request.deleted_at = deleted_at;
    repos.rename_events.record_move(&request).await?;

    let kept = repos
        .files
        .get_by_path(root, "/show2/keep.mkv")
        .await?
        .expect("moved with its directory");
    assert!(!kept.deleted);

    let ghost = repos
        .files
        .get_by_path(root, "/show2/old.mkv")
        .await?
        .expect("tombstone follows the directory");
    assert!(ghost.deleted);
    assert!(ghost.deleted_at.is_some());
    Ok(())
}

#[sqlx::test(migrator = "catalog_core::MIGRATOR")]
async fn failed_move_appends_a_failed_event(pool: PgPool) -> anyhow::Result<()> {
    let repos = CatalogRepositories::postgres(pool);
    let root = seed_root(&repos).await?;
    repos.files.upsert(&record(root, "/kept.txt", false)).await?;

    let result = repos
        .rename_events
        .record_move(&move_request(root, FileId(i64::MAX), "/gone.txt", "/moved.txt", false))
        .await;
    assert!(result.is_err());

    let counts = repos.rename_events.counts().await?;
    assert_eq!((counts.total, counts.processed, counts.failed), (1, 0, 1));

    let recent = repos.rename_events.recent(Some(root), 10).await?;
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].status, RenameStatus::Failed);
    assert_eq!(recent[0].old_path, "/gone.txt");

    let kept = repos.files.get_by_path(root, "/kept.txt").await?;
    assert!(kept.is_some_and(|file| !file.deleted));
    Ok(())
}

#[sqlx::test(migrator = "catalog_core::MIGRATOR")]
async fn seasons_are_found_under_their_show(pool: PgPool) -> anyhow::Result<()> {
    let repos = CatalogRepositories::postgres(pool);
    let show_type = repos
        .media_items
        .get_media_type_by_name(MediaKind::TvShow.as_str())
        .await?;
    let season_type = repos
        .media_items
        .get_media_type_by_name(MediaKind::TvSeason.as_str())
        .await?;

    let show = repos
        .media_items
        .create(&NewMediaItem::detected(show_type, "Breaking Bad"))
        .await?;
    let mut season = NewMediaItem::detected(season_type, "Season 1");
    season.parent_id = Some(show.id);
    season.season_number = Some(1);
    let season = repos.media_items.create(&season).await?;

    let found = repos
        .media_items
        .get_child_by_title(show.id, "Season 1", season_type)
        .await?;
    assert_eq!(found.map(|item| item.id), Some(season.id));

    let children = repos.media_items.list_child_items(show.id).await?;
    assert_eq!(children.len(), 1);
    assert!(repos.media_items.get_media_type_by_name("podcast").await.is_err());
    Ok(())
}

#[sqlx::test(migrator = "catalog_core::MIGRATOR")]
async fn directory_analysis_is_keyed_by_path(pool: PgPool) -> anyhow::Result<()> {
    let repos = CatalogRepositories::postgres(pool);
    let analysis = DirectoryAnalysis {
        id: 0,
        directory_path: "/movies/Heat (1995)".to_string(),
        media_item_id: None,
        confidence_score: 0.8,
        detection_method: "title_parser".to_string(),
        files_count: 2,
        total_size: 1024,
    };

    let id = repos.directory_analyses.create(&analysis).await?;
    let mut stored = repos
        .directory_analyses
        .get_by_path("/movies/Heat (1995)")
        .await?
        .expect("analysis should exist");
    assert_eq!(stored.id, id);

    stored.files_count = 3;
    repos.directory_analyses.update(&stored).await?;
    let updated = repos
        .directory_analyses
        .get_by_path("/movies/Heat (1995)")
        .await?
        .expect("analysis should exist");
    assert_eq!(updated.files_count, 3);
    assert_eq!(updated.id, id);
    Ok(())
}
