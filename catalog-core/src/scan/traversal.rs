//! Depth-limited directory walk shared by every protocol scanner.

use std::collections::HashSet;

use futures::future::join_all;
use glob::Pattern;
use tracing::{debug, warn};

use super::protocol::ScanStrategy;
use super::{ScanJob, ScanStatus};
use crate::catalog::CatalogWriter;
use crate::error::{CatalogError, Result};
use crate::fs::{FileSystemClient, RemoteFileInfo};
use crate::paths;

/// Fingerprint reads in flight per batch.
const FINGERPRINT_CONCURRENCY: usize = 8;

/// What a traversal touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalReport {
    pub directories_listed: u64,
    pub entries_written: u64,
    pub entries_filtered: u64,
    pub listing_failures: u64,
    pub write_failures: u64,
    pub deletions: u64,
}

/// Include/exclude globs matched against entry names.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl PathFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        let compile = |patterns: &[String]| -> Result<Vec<Pattern>> {
            patterns
                .iter()
                .map(|raw| {
                    Pattern::new(raw).map_err(|err| {
                        CatalogError::InvalidInput(format!("invalid pattern {raw:?}: {err}"))
                    })
                })
                .collect()
        };
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    /// Excluded entries are dropped outright. Include patterns only narrow
    /// files, so directories stay walkable.
    pub fn allows(&self, entry: &RemoteFileInfo) -> bool {
        if self.exclude.iter().any(|p| p.matches(&entry.name)) {
            return false;
        }
        entry.is_dir
            || self.include.is_empty()
            || self.include.iter().any(|p| p.matches(&entry.name))
    }
}

/// Walk `job.path` with an explicit stack, writing every admitted entry.
///
/// The job's own directory is listed at depth 0; a subdirectory is listed
/// only while its depth stays within `job.max_depth`. A listing failure on
/// the job directory fails the walk, elsewhere it is counted and skipped.
/// With `reconcile` set, each listed directory's vanished children are
/// soft-deleted before its entries are written.
pub async fn traverse(
    client: &dyn FileSystemClient,
    job: &ScanJob,
    status: &ScanStatus,
    writer: &CatalogWriter,
    strategy: &ScanStrategy,
    reconcile: bool,
) -> Result<TraversalReport> {
    let filter = PathFilter::new(&job.include_patterns, &job.exclude_patterns)?;
    let batch_size = strategy.batch_size.max(1);
    let root = &job.storage_root;
    let mut report = TraversalReport::default();
    let mut stack: Vec<(String, u32)> = vec![(job.path.clone(), 0)];

    while let Some((dir, depth)) = stack.pop() {
        check_cancelled(job)?;
        status.set_current_path(&dir);

        let listing = match client.list_directory(&dir).await {
            Ok(listing) => listing,
            Err(err) if dir == job.path => return Err(err),
            Err(err) => {
                warn!(
                    job_id = %job.id,
                    storage_root = %root.name,
                    path = %dir,
                    error = %err,
                    "directory listing failed, skipping"
                );
                status.record_error();
                report.listing_failures += 1;
                continue;
            }
        };
        report.directories_listed += 1;

        if reconcile {
            let present: HashSet<String> = listing.iter().map(|e| e.name.clone()).collect();
            match writer.reconcile_directory(root, &dir, &present, status).await {
                Ok(deleted) => report.deletions += deleted,
                Err(err) => {
                    warn!(
                        job_id = %job.id,
                        path = %dir,
                        error = %err,
                        "deletion reconciliation failed"
                    );
                    status.record_error();
                }
            }
        }

        let (admitted, filtered): (Vec<_>, Vec<_>) =
            listing.into_iter().partition(|entry| filter.allows(entry));
        report.entries_filtered += filtered.len() as u64;

        let mut subdirectories = Vec::new();
        for (batch_index, batch) in admitted.chunks(batch_size).enumerate() {
            let fingerprints = fingerprint_batch(client, &dir, batch, strategy).await;

            for (entry, fingerprint) in batch.iter().zip(fingerprints) {
                check_cancelled(job)?;
                let path = paths::join(&dir, &entry.name);

                match writer
                    .insert_file_record(root, &path, entry, fingerprint, status)
                    .await
                {
                    Ok(_) => report.entries_written += 1,
                    Err(err) => {
                        warn!(
                            job_id = %job.id,
                            path = %path,
                            error = %err,
                            "failed to record entry"
                        );
                        status.record_error();
                        report.write_failures += 1;
                    }
                }

                if entry.is_dir && depth < job.max_depth {
                    subdirectories.push(path);
                }
            }

            debug!(
                job_id = %job.id,
                path = %dir,
                batch = batch_index,
                entries = batch.len(),
                "batch written"
            );
        }

        // Reverse so the stack pops subdirectories in listing order.
        stack.extend(subdirectories.into_iter().rev().map(|path| (path, depth + 1)));
    }

    Ok(report)
}

fn check_cancelled(job: &ScanJob) -> Result<()> {
    if job.cancel.is_cancelled() {
        return Err(CatalogError::Cancelled(format!("scan {} cancelled", job.id)));
    }
    Ok(())
}

async fn fingerprint_batch(
    client: &dyn FileSystemClient,
    dir: &str,
    batch: &[RemoteFileInfo],
    strategy: &ScanStrategy,
) -> Vec<Option<String>> {
    if !strategy.checksum_calculation {
        return vec![None; batch.len()];
    }

    let mut fingerprints = Vec::with_capacity(batch.len());
    for chunk in batch.chunks(FINGERPRINT_CONCURRENCY) {
        let mut reads = Vec::with_capacity(chunk.len());
        for entry in chunk {
            reads.push(fingerprint_entry(client, dir, entry));
        }
        fingerprints.extend(join_all(reads).await);
    }
    fingerprints
}

async fn fingerprint_entry(
    client: &dyn FileSystemClient,
    dir: &str,
    entry: &RemoteFileInfo,
) -> Option<String> {
    if entry.is_dir {
        return None;
    }
    let path = paths::join(dir, &entry.name);
    match client.fingerprint(&path, entry.size).await {
        Ok(fingerprint) => fingerprint,
        Err(err) => {
            debug!(path = %path, error = %err, "fingerprint unavailable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclude_wins_and_include_only_narrows_files() {
        let filter = PathFilter::new(&["*.mkv".into()], &[".*".into()]).expect("patterns");

        assert!(filter.allows(&RemoteFileInfo::file("movie.mkv", 1)));
        assert!(!filter.allows(&RemoteFileInfo::file("notes.txt", 1)));
        assert!(filter.allows(&RemoteFileInfo::dir("Extras")));
        assert!(!filter.allows(&RemoteFileInfo::dir(".git")));
        assert!(!filter.allows(&RemoteFileInfo::file(".hidden.mkv", 1)));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let err = PathFilter::new(&["[".into()], &[]).expect_err("unterminated class");
        assert!(matches!(err, CatalogError::InvalidInput(_)));
    }
}
