use async_trait::async_trait;
use catalog_model::{
    DirectoryAnalysis, FileId, MediaFileLink, MediaItem, MediaItemId, MediaTypeId,
    NewMediaItem,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::database::ports::{
    DirectoryAnalysisRepository, FileLinkRepository, MediaItemRepository,
};
use crate::error::{CatalogError, Result};

const ITEM_COLUMNS: &str = r#"
    id, media_type_id, title, year, parent_id, season_number, episode_number,
    status, created_at, updated_at
"#;

#[derive(Clone, Debug)]
pub struct PostgresMediaItemRepository {
    pool: PgPool,
}

impl PostgresMediaItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MediaItemRepository for PostgresMediaItemRepository {
    async fn get_media_type_by_name(&self, name: &str) -> Result<MediaTypeId> {
        sqlx::query_scalar::<_, MediaTypeId>("SELECT id FROM media_types WHERE name = $1")
            .bind(name)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("media type '{name}'")))
    }

    async fn get_by_title(
        &self,
        title: &str,
        media_type_id: MediaTypeId,
    ) -> Result<Option<MediaItem>> {
        let row = sqlx::query_as::<_, MediaItemRow>(&format!(
            r#"
            SELECT {ITEM_COLUMNS} FROM media_items
            WHERE title = $1 AND media_type_id = $2
            ORDER BY id
            LIMIT 1
            "#
        ))
        .bind(title)
        .bind(media_type_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(MediaItem::from))
    }

    async fn get_child_by_title(
        &self,
        parent_id: MediaItemId,
        title: &str,
        media_type_id: MediaTypeId,
    ) -> Result<Option<MediaItem>> {
        let row = sqlx::query_as::<_, MediaItemRow>(&format!(
            r#"
            SELECT {ITEM_COLUMNS} FROM media_items
            WHERE parent_id = $1 AND title = $2 AND media_type_id = $3
            ORDER BY id
            LIMIT 1
            "#
        ))
        .bind(parent_id)
        .bind(title)
        .bind(media_type_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(MediaItem::from))
    }

    async fn create(&self, item: &NewMediaItem) -> Result<MediaItem> {
        let row = sqlx::query_as::<_, MediaItemRow>(&format!(
            r#"
            INSERT INTO media_items (
                media_type_id, title, year, parent_id, season_number, episode_number, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(item.media_type_id)
        .bind(&item.title)
        .bind(item.year)
        .bind(item.parent_id)
        .bind(item.season_number)
        .bind(item.episode_number)
        .bind(&item.status)
        .fetch_one(self.pool())
        .await?;

        Ok(row.into())
    }

    async fn update(&self, item: &MediaItem) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE media_items
            SET title = $2,
                year = $3,
                parent_id = $4,
                season_number = $5,
                episode_number = $6,
                status = $7,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(item.id)
        .bind(&item.title)
        .bind(item.year)
        .bind(item.parent_id)
        .bind(item.season_number)
        .bind(item.episode_number)
        .bind(&item.status)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    async fn list_child_items(&self, parent_id: MediaItemId) -> Result<Vec<MediaItem>> {
        let rows = sqlx::query_as::<_, MediaItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM media_items WHERE parent_id = $1 ORDER BY id"
        ))
        .bind(parent_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(MediaItem::from).collect())
    }
}

#[derive(Clone, Debug)]
pub struct PostgresFileLinkRepository {
    pool: PgPool,
}

impl PostgresFileLinkRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileLinkRepository for PostgresFileLinkRepository {
    async fn link_file_to_item(
        &self,
        media_item_id: MediaItemId,
        file_id: FileId,
        is_primary: bool,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO media_item_files (media_item_id, file_id, is_primary)
            VALUES ($1, $2, $3)
            ON CONFLICT (media_item_id, file_id) DO UPDATE SET
                is_primary = EXCLUDED.is_primary
            "#,
        )
        .bind(media_item_id)
        .bind(file_id)
        .bind(is_primary)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn links_for_item(&self, media_item_id: MediaItemId) -> Result<Vec<MediaFileLink>> {
        let rows = sqlx::query_as::<_, (MediaItemId, FileId, bool)>(
            r#"
            SELECT media_item_id, file_id, is_primary
            FROM media_item_files
            WHERE media_item_id = $1
            ORDER BY is_primary DESC, file_id
            "#,
        )
        .bind(media_item_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(media_item_id, file_id, is_primary)| MediaFileLink {
                media_item_id,
                file_id,
                is_primary,
            })
            .collect())
    }
}

#[derive(Clone, Debug)]
pub struct PostgresDirectoryAnalysisRepository {
    pool: PgPool,
}

impl PostgresDirectoryAnalysisRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DirectoryAnalysisRepository for PostgresDirectoryAnalysisRepository {
    async fn get_by_path(&self, directory_path: &str) -> Result<Option<DirectoryAnalysis>> {
        let row = sqlx::query_as::<_, DirectoryAnalysisRow>(
            r#"
            SELECT id, directory_path, media_item_id, confidence_score,
                   detection_method, files_count, total_size
            FROM directory_analyses
            WHERE directory_path = $1
            "#,
        )
        .bind(directory_path)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(DirectoryAnalysis::from))
    }

    async fn create(&self, analysis: &DirectoryAnalysis) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO directory_analyses (
                directory_path, media_item_id, confidence_score,
                detection_method, files_count, total_size
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (directory_path) DO UPDATE SET
                media_item_id = EXCLUDED.media_item_id,
                confidence_score = EXCLUDED.confidence_score,
                detection_method = EXCLUDED.detection_method,
                files_count = EXCLUDED.files_count,
                total_size = EXCLUDED.total_size,
                updated_at = NOW()
            RETURNING id
            "#,
        )
        .bind(&analysis.directory_path)
        .bind(analysis.media_item_id)
        .bind(analysis.confidence_score)
        .bind(&analysis.detection_method)
        .bind(analysis.files_count)
        .bind(analysis.total_size)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn update(&self, analysis: &DirectoryAnalysis) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE directory_analyses
            SET media_item_id = $2,
                confidence_score = $3,
                detection_method = $4,
                files_count = $5,
                total_size = $6,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(analysis.id)
        .bind(analysis.media_item_id)
        .bind(analysis.confidence_score)
        .bind(&analysis.detection_method)
        .bind(analysis.files_count)
        .bind(analysis.total_size)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct MediaItemRow {
    id: MediaItemId,
    media_type_id: MediaTypeId,
    title: String,
    year: Option<i32>,
    parent_id: Option<MediaItemId>,
    season_number: Option<i32>,
    episode_number: Option<i32>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MediaItemRow> for MediaItem {
    fn from(row: MediaItemRow) -> Self {
        MediaItem {
            id: row.id,
            media_type_id: row.media_type_id,
            title: row.title,
            year: row.year,
            parent_id: row.parent_id,
            season_number: row.season_number,
            episode_number: row.episode_number,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DirectoryAnalysisRow {
    id: i64,
    directory_path: String,
    media_item_id: Option<MediaItemId>,
    confidence_score: f64,
    detection_method: String,
    files_count: i32,
    total_size: i64,
}

impl From<DirectoryAnalysisRow> for DirectoryAnalysis {
    fn from(row: DirectoryAnalysisRow) -> Self {
        DirectoryAnalysis {
            id: row.id,
            directory_path: row.directory_path,
            media_item_id: row.media_item_id,
            confidence_score: row.confidence_score,
            detection_method: row.detection_method,
            files_count: row.files_count,
            total_size: row.total_size,
        }
    }
}
