//! Moves and deletions observed across consecutive full scans.

mod support;

use catalog_core::moves::MoveTrackerConfig;
use catalog_core::{ScanStatus, ScannerRegistry};
use catalog_model::{RenameStatus, ScanType};
use chrono::Utc;
use support::{Harness, ROOT_NAME};

#[tokio::test]
async fn renamed_file_keeps_its_record() {
    let harness = Harness::new();
    harness
        .client
        .add_file_with_fingerprint("/movies/heat.mkv", 4_096, "h1");
    harness.scan(ScanType::Full).await;
    let original = harness.record("/movies/heat.mkv").await.expect("catalogued");

    harness.client.rename("/movies/heat.mkv", "/movies/Heat (1995).mkv");
    let status = harness.scan(ScanType::Full).await;

    let moved = harness
        .record("/movies/Heat (1995).mkv")
        .await
        .expect("moved record");
    assert_eq!(moved.id, original.id);
    assert!(!moved.deleted);
    assert!(harness.record("/movies/heat.mkv").await.is_none());
    assert_eq!(status.files_deleted, 1);
    assert_eq!(status.files_updated, 1);

    let events = harness
        .tracker
        .recent_rename_events(None, 10)
        .await
        .expect("events");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].old_path, "/movies/heat.mkv");
    assert_eq!(events[0].new_path, "/movies/Heat (1995).mkv");
    assert_eq!(events[0].status, RenameStatus::Processed);
    assert_eq!(harness.tracker.pending_count().await, 0);
}

#[tokio::test]
async fn moved_directory_cascades_to_descendants() {
    let harness = Harness::new();
    harness
        .client
        .add_file_with_fingerprint("/test_dir/nested_file.txt", 12, "n1");
    harness.scan(ScanType::Full).await;
    let dir = harness.record("/test_dir").await.expect("dir catalogued");
    let nested = harness
        .record("/test_dir/nested_file.txt")
        .await
        .expect("file catalogued");

    harness.client.rename("/test_dir", "/moved_dir");
    harness.scan(ScanType::Full).await;

    let moved_dir = harness.record("/moved_dir").await.expect("dir moved");
    let moved_nested = harness
        .record("/moved_dir/nested_file.txt")
        .await
        .expect("nested file moved");
    assert_eq!(moved_dir.id, dir.id);
    assert_eq!(moved_nested.id, nested.id);
    assert!(!moved_nested.deleted);
    assert_eq!(moved_nested.parent_id, Some(dir.id));
    assert_eq!(
        harness.live_paths().await,
        vec!["/moved_dir".to_string(), "/moved_dir/nested_file.txt".to_string()]
    );

    // The nested deletion was covered by the directory move.
    assert_eq!(harness.tracker.pending_count().await, 0);
    let events = harness
        .tracker
        .recent_rename_events(None, 10)
        .await
        .expect("events");
    assert_eq!(events.len(), 1);
    assert!(events[0].is_directory);
}

#[tokio::test]
async fn directory_move_leaves_earlier_deletions_deleted() {
    let harness = Harness::new();
    harness
        .client
        .add_file_with_fingerprint("/lib/show/keep.mkv", 100, "k1");
    harness
        .client
        .add_file_with_fingerprint("/lib/show/old.mkv", 200, "o1");
    harness.scan(ScanType::Full).await;

    harness.client.remove("/lib/show/old.mkv");
    harness.scan(ScanType::Full).await;
    let expired = harness
        .tracker
        .sweep_expired_at(Utc::now() + chrono::Duration::hours(1))
        .await;
    assert_eq!(expired, 1);

    // The moved directory sits at the depth limit, so its children are not
    // listed again in this pass.
    harness.client.rename("/lib/show", "/lib/show2");
    let status = harness.scan_job(harness.job().with_max_depth(1)).await;
    assert_eq!(status.error_count, 0);

    let old = harness
        .record("/lib/show2/old.mkv")
        .await
        .expect("tombstone moved with its directory");
    assert!(old.deleted);
    assert_eq!(
        harness.live_paths().await,
        vec![
            "/lib".to_string(),
            "/lib/show2".to_string(),
            "/lib/show2/keep.mkv".to_string(),
        ]
    );
    assert_eq!(harness.tracker.pending_count().await, 0);

    let rescan = harness.scan(ScanType::Full).await;
    assert_eq!(rescan.files_deleted, 0);
    assert_eq!(harness.tracker.pending_count().await, 0);
}

#[tokio::test]
async fn unchanged_tree_rescan_is_idempotent() {
    let harness = Harness::new();
    harness.client.add_file_with_fingerprint("/a/one.mkv", 10, "x1");
    harness.client.add_file("/a/two.srt", 2);
    harness.client.add_file("/b/three.flac", 30);

    let first = harness.scan(ScanType::Full).await;
    let rows_after_first = harness.files().await.len();
    let second = harness.scan(ScanType::Full).await;

    assert_eq!(rows_after_first, 5);
    assert_eq!(harness.files().await.len(), rows_after_first);
    assert_eq!(first.files_found, 5);
    assert_eq!(second.files_found, 5);
    assert_eq!(second.files_updated, 0);
    assert_eq!(second.files_deleted, 0);
    let stats = harness.tracker.statistics().await.expect("statistics");
    assert_eq!(stats.total_renames, 0);
}

#[tokio::test]
async fn vanished_file_is_soft_deleted_and_parked() {
    let harness = Harness::new();
    harness.client.add_file_with_fingerprint("/docs/report.pdf", 100, "r1");
    harness.client.add_file("/docs/keep.txt", 5);
    harness.scan(ScanType::Full).await;

    harness.client.remove("/docs/report.pdf");
    let status = harness.scan(ScanType::Full).await;

    let gone = harness.record("/docs/report.pdf").await.expect("row kept");
    assert!(gone.deleted);
    assert!(gone.deleted_at.is_some());
    assert_eq!(status.files_deleted, 1);
    assert_eq!(harness.tracker.pending_count().await, 1);
}

#[tokio::test]
async fn incremental_scan_leaves_vanished_files_alone() {
    let harness = Harness::new();
    harness.client.add_file("/docs/report.pdf", 100);
    harness.scan(ScanType::Full).await;

    harness.client.remove("/docs/report.pdf");
    let status = harness.scan(ScanType::Incremental).await;

    assert_eq!(status.files_deleted, 0);
    let record = harness.record("/docs/report.pdf").await.expect("row kept");
    assert!(!record.deleted);
}

#[tokio::test]
async fn creation_after_window_is_a_new_file() {
    let mut config = MoveTrackerConfig::default();
    config.move_window_ms = 0;
    let harness = Harness::with_tracker_config(config);
    harness.client.add_file_with_fingerprint("/a/old.bin", 64, "same");
    harness.scan(ScanType::Full).await;
    let old = harness.record("/a/old.bin").await.expect("catalogued");

    harness.client.remove("/a/old.bin");
    harness.scan(ScanType::Full).await;
    assert_eq!(harness.tracker.pending_count().await, 1);

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    harness.client.add_file_with_fingerprint("/a/new.bin", 64, "same");
    harness.scan(ScanType::Full).await;

    let new = harness.record("/a/new.bin").await.expect("new record");
    assert_ne!(new.id, old.id);
    assert!(harness.record("/a/old.bin").await.expect("row kept").deleted);
    assert_eq!(harness.tracker.pending_count().await, 0);
    let stats = harness.tracker.statistics().await.expect("statistics");
    assert_eq!(stats.total_renames, 0);
}

#[tokio::test]
async fn failed_rewrite_falls_back_to_insert() {
    let harness = Harness::new();
    harness.client.add_file_with_fingerprint("/a/old.bin", 64, "same");
    harness.scan(ScanType::Full).await;

    harness.catalog.fail_moves(true).await;
    harness.client.rename("/a/old.bin", "/a/new.bin");
    let status = harness.scan(ScanType::Full).await;

    assert!(harness.record("/a/new.bin").await.is_some());
    assert!(harness.record("/a/old.bin").await.expect("row kept").deleted);
    assert_eq!(status.error_count, 1);

    let stats = harness.tracker.statistics().await.expect("statistics");
    assert_eq!(stats.total_renames, 1);
    assert_eq!(stats.failed_renames, 1);
    assert_eq!(stats.success_rate, 0.0);
}

#[tokio::test]
async fn excluded_entries_are_neither_written_nor_walked() {
    let harness = Harness::new();
    harness.client.add_file("/movies/heat.mkv", 10);
    harness.client.add_file("/movies/heat.nfo", 1);
    harness.client.add_file("/.trash/old.mkv", 10);

    let job = harness
        .job()
        .with_include_patterns(vec!["*.mkv".into()])
        .with_exclude_patterns(vec![".*".into()]);
    let status = ScanStatus::new(job.id, ROOT_NAME, job.storage_root.protocol);
    let scanner = ScannerRegistry::with_defaults()
        .get(job.storage_root.protocol)
        .expect("scanner");
    let report = scanner
        .scan_path(&harness.client, &job, &status, &harness.writer)
        .await
        .expect("scan");

    assert_eq!(
        harness.live_paths().await,
        vec!["/movies".to_string(), "/movies/heat.mkv".to_string()]
    );
    assert_eq!(report.entries_filtered, 2);
}

#[tokio::test]
async fn depth_limit_stops_recursion() {
    let harness = Harness::new();
    harness.client.add_file("/a/b/c/deep.txt", 1);

    let job = harness.job().with_max_depth(1);
    let status = ScanStatus::new(job.id, ROOT_NAME, job.storage_root.protocol);
    let scanner = ScannerRegistry::with_defaults()
        .get(job.storage_root.protocol)
        .expect("scanner");
    scanner
        .scan_path(&harness.client, &job, &status, &harness.writer)
        .await
        .expect("scan");

    assert_eq!(
        harness.live_paths().await,
        vec!["/a".to_string(), "/a/b".to_string()]
    );
}

#[tokio::test]
async fn statistics_report_processed_and_failed_moves() {
    let harness = Harness::new();
    for name in ["one", "two", "three"] {
        harness
            .client
            .add_file_with_fingerprint(&format!("/src/{name}.bin"), 10, name);
    }
    harness.scan(ScanType::Full).await;

    harness.client.rename("/src/one.bin", "/src/one-renamed.bin");
    harness.client.rename("/src/two.bin", "/src/two-renamed.bin");
    harness.scan(ScanType::Full).await;

    harness.catalog.fail_moves(true).await;
    harness.client.rename("/src/three.bin", "/src/three-renamed.bin");
    harness.scan(ScanType::Full).await;

    let stats = harness.tracker.statistics().await.expect("statistics");
    assert_eq!(stats.total_renames, 3);
    assert_eq!(stats.successful_renames, 2);
    assert_eq!(stats.failed_renames, 1);
    assert!((stats.success_rate - 66.67).abs() < 0.01);
}
