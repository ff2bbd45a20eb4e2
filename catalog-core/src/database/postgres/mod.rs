//! PostgreSQL adapters for the repository ports.
//!
//! Queries are built at runtime (`sqlx::query_as` with explicit row types) so
//! the crate compiles without a live database.

mod files;
mod media;
mod rename_events;
mod storage_roots;

pub use files::PostgresFileRepository;
pub use media::{
    PostgresDirectoryAnalysisRepository, PostgresFileLinkRepository,
    PostgresMediaItemRepository,
};
pub use rename_events::PostgresRenameEventRepository;
pub use storage_roots::PostgresStorageRootRepository;

/// `left(path, length(prefix) + 1) = prefix || '/'` argument for strict
/// descendants of `path`; `None` when `path` is the root and every row
/// qualifies.
pub(crate) fn descendant_prefix(path: &str) -> Option<String> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
