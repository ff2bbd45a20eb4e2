use async_trait::async_trait;
use catalog_model::{FileId, FileRecord, FileType, NewFileRecord, StorageRootId};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::descendant_prefix;
use crate::database::ports::{FileRepository, UpsertOutcome};
use crate::error::Result;

const FILE_COLUMNS: &str = r#"
    id, storage_root_id, path, name, extension, mime_type, file_type, size,
    is_directory, parent_id, quick_hash, modified_at, last_scan_at, deleted, deleted_at
"#;

#[derive(Clone, Debug)]
pub struct PostgresFileRepository {
    pool: PgPool,
}

impl PostgresFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl FileRepository for PostgresFileRepository {
    async fn get_by_path(
        &self,
        root_id: StorageRootId,
        path: &str,
    ) -> Result<Option<FileRecord>> {
        let row = sqlx::query_as::<_, FileRow>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE storage_root_id = $1 AND path = $2"
        ))
        .bind(root_id)
        .bind(path)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(FileRecord::from))
    }

    async fn find_directory_id(
        &self,
        root_id: StorageRootId,
        path: &str,
    ) -> Result<Option<FileId>> {
        let id = sqlx::query_scalar::<_, FileId>(
            r#"
            SELECT id FROM files
            WHERE storage_root_id = $1 AND path = $2 AND is_directory AND NOT deleted
            "#,
        )
        .bind(root_id)
        .bind(path)
        .fetch_optional(self.pool())
        .await?;

        Ok(id)
    }

    async fn upsert(&self, record: &NewFileRecord) -> Result<UpsertOutcome> {
        let row = sqlx::query_as::<_, UpsertRow>(
            r#"
            INSERT INTO files (
                storage_root_id, path, name, extension, mime_type, file_type, size,
                is_directory, parent_id, quick_hash, modified_at, last_scan_at,
                deleted, deleted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, FALSE, NULL)
            ON CONFLICT (storage_root_id, path) DO UPDATE SET
                name = EXCLUDED.name,
                extension = EXCLUDED.extension,
                mime_type = EXCLUDED.mime_type,
                file_type = EXCLUDED.file_type,
                size = EXCLUDED.size,
                is_directory = EXCLUDED.is_directory,
                parent_id = EXCLUDED.parent_id,
                quick_hash = COALESCE(EXCLUDED.quick_hash, files.quick_hash),
                modified_at = EXCLUDED.modified_at,
                last_scan_at = EXCLUDED.last_scan_at,
                deleted = FALSE,
                deleted_at = NULL,
                updated_at = NOW()
            RETURNING id, (xmax = 0) AS inserted
            "#,
        )
        .bind(record.storage_root_id)
        .bind(&record.path)
        .bind(&record.name)
        .bind(&record.extension)
        .bind(&record.mime_type)
        .bind(record.file_type.as_str())
        .bind(record.size)
        .bind(record.is_directory)
        .bind(record.parent_id)
        .bind(&record.quick_hash)
        .bind(record.modified_at)
        .bind(record.last_scan_at)
        .fetch_one(self.pool())
        .await?;

        Ok(UpsertOutcome {
            id: row.id,
            inserted: row.inserted,
        })
    }

    async fn list_children(&self, root_id: StorageRootId, dir: &str) -> Result<Vec<FileRecord>> {
        let parent = dir.trim_end_matches('/');
        let rows = sqlx::query_as::<_, FileRow>(&format!(
            r#"
            SELECT {FILE_COLUMNS} FROM files
            WHERE storage_root_id = $1
              AND NOT deleted
              AND left(path, length($2) + 1) = $2 || '/'
              AND strpos(substr(path, length($2) + 2), '/') = 0
            ORDER BY path
            "#
        ))
        .bind(root_id)
        .bind(parent)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(FileRecord::from).collect())
    }

    async fn list_subtree(&self, root_id: StorageRootId, path: &str) -> Result<Vec<FileRecord>> {
        let rows = sqlx::query_as::<_, FileRow>(&format!(
            r#"
            SELECT {FILE_COLUMNS} FROM files
            WHERE storage_root_id = $1
              AND NOT deleted
              AND ($2::text IS NULL OR path = $2 OR left(path, length($2) + 1) = $2 || '/')
            ORDER BY path
            "#
        ))
        .bind(root_id)
        .bind(descendant_prefix(path))
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(FileRecord::from).collect())
    }

    async fn mark_deleted(&self, ids: &[FileId], at: DateTime<Utc>) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let raw: Vec<i64> = ids.iter().map(|id| id.get()).collect();
        let result = sqlx::query(
            r#"
            UPDATE files
            SET deleted = TRUE, deleted_at = $2, updated_at = NOW()
            WHERE id = ANY($1) AND NOT deleted
            "#,
        )
        .bind(&raw)
        .bind(at)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected())
    }

    async fn top_level_directories(&self, root_id: StorageRootId) -> Result<Vec<FileRecord>> {
        let rows = sqlx::query_as::<_, FileRow>(&format!(
            r#"
            SELECT {FILE_COLUMNS} FROM files
            WHERE storage_root_id = $1 AND is_directory AND NOT deleted AND parent_id IS NULL
            ORDER BY path
            "#
        ))
        .bind(root_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(FileRecord::from).collect())
    }

    async fn child_files(&self, parent_id: FileId) -> Result<Vec<FileRecord>> {
        let rows = sqlx::query_as::<_, FileRow>(&format!(
            r#"
            SELECT {FILE_COLUMNS} FROM files
            WHERE parent_id = $1 AND NOT is_directory AND NOT deleted
            ORDER BY name
            "#
        ))
        .bind(parent_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(FileRecord::from).collect())
    }

    async fn count(&self, root_id: StorageRootId) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM files WHERE storage_root_id = $1",
        )
        .bind(root_id)
        .fetch_one(self.pool())
        .await?;

        Ok(count)
    }
}

#[derive(sqlx::FromRow)]
struct UpsertRow {
    id: FileId,
    inserted: bool,
}

#[derive(sqlx::FromRow)]
struct FileRow {
    id: FileId,
    storage_root_id: StorageRootId,
    path: String,
    name: String,
    extension: Option<String>,
    mime_type: Option<String>,
    file_type: String,
    size: i64,
    is_directory: bool,
    parent_id: Option<FileId>,
    quick_hash: Option<String>,
    modified_at: Option<DateTime<Utc>>,
    last_scan_at: DateTime<Utc>,
    deleted: bool,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<FileRow> for FileRecord {
    fn from(row: FileRow) -> Self {
        FileRecord {
            id: row.id,
            storage_root_id: row.storage_root_id,
            path: row.path,
            name: row.name,
            extension: row.extension,
            mime_type: row.mime_type,
            file_type: row.file_type.parse().unwrap_or(FileType::Other),
            size: row.size,
            is_directory: row.is_directory,
            parent_id: row.parent_id,
            quick_hash: row.quick_hash,
            modified_at: row.modified_at,
            last_scan_at: row.last_scan_at,
            deleted: row.deleted,
            deleted_at: row.deleted_at,
        }
    }
}
