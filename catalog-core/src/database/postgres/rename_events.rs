use async_trait::async_trait;
use catalog_model::{FileId, RenameEvent, RenameEventId, RenameStatus, StorageRootId};
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::{debug, warn};

use super::descendant_prefix;
use crate::database::ports::{MoveRequest, RenameCounts, RenameEventRepository};
use crate::error::{CatalogError, Result};
use crate::paths;

const EVENT_COLUMNS: &str = r#"
    id, storage_root_id, old_path, new_path, is_directory, size, file_hash,
    detected_at, processed_at, status
"#;

#[derive(Clone, Debug)]
pub struct PostgresRenameEventRepository {
    pool: PgPool,
}

impl PostgresRenameEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn insert_event(
        conn: &mut PgConnection,
        request: &MoveRequest,
        status: RenameStatus,
    ) -> Result<RenameEventId> {
        let processed_at: Option<DateTime<Utc>> = match status {
            RenameStatus::Pending => None,
            RenameStatus::Processed | RenameStatus::Failed => Some(Utc::now()),
        };
        let id = sqlx::query_scalar::<_, RenameEventId>(
            r#"
            INSERT INTO rename_events (
                storage_root_id, old_path, new_path, is_directory, size, file_hash,
                detected_at, processed_at, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(request.storage_root_id)
        .bind(&request.old_path)
        .bind(&request.new_path)
        .bind(request.is_directory)
        .bind(request.size)
        .bind(&request.file_hash)
        .bind(request.detected_at)
        .bind(processed_at)
        .bind(status.as_str())
        .fetch_one(&mut *conn)
        .await?;

        Ok(id)
    }

    /// Rewrite paths and finalize the event inside the caller's transaction.
    async fn apply_move(conn: &mut PgConnection, request: &MoveRequest) -> Result<RenameEvent> {
        let event_id = Self::insert_event(&mut *conn, request, RenameStatus::Pending).await?;

        let parent_id = match paths::parent(&request.new_path) {
            Some(parent) => {
                sqlx::query_scalar::<_, FileId>(
                    r#"
                    SELECT id FROM files
                    WHERE storage_root_id = $1 AND path = $2 AND is_directory AND NOT deleted
                    "#,
                )
                .bind(request.storage_root_id)
                .bind(parent)
                .fetch_optional(&mut *conn)
                .await?
            }
            None => None,
        };

        let updated = sqlx::query(
            r#"
            UPDATE files
            SET path = $2,
                name = $3,
                parent_id = $4,
                deleted = FALSE,
                deleted_at = NULL,
                last_scan_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND storage_root_id = $5
            "#,
        )
        .bind(request.file_id)
        .bind(&request.new_path)
        .bind(paths::file_name(&request.new_path))
        .bind(parent_id)
        .bind(request.storage_root_id)
        .execute(&mut *conn)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(CatalogError::NotFound(format!(
                "file {} for move {} -> {}",
                request.file_id, request.old_path, request.new_path
            )));
        }

        if request.is_directory
            && let Some(old_prefix) = descendant_prefix(&request.old_path)
        {
            let cascaded = sqlx::query(
                r#"
                UPDATE files
                SET path = $3 || substr(path, length($2) + 1),
                    deleted = deleted AND COALESCE(deleted_at < $4, FALSE),
                    deleted_at = CASE WHEN deleted AND deleted_at < $4 THEN deleted_at END,
                    updated_at = NOW()
                WHERE storage_root_id = $1
                  AND left(path, length($2) + 1) = $2 || '/'
                "#,
            )
            .bind(request.storage_root_id)
            .bind(&old_prefix)
            .bind(request.new_path.trim_end_matches('/'))
            .bind(request.deleted_at)
            .execute(&mut *conn)
            .await?;

            debug!(
                old_path = %request.old_path,
                new_path = %request.new_path,
                descendants = cascaded.rows_affected(),
                "cascaded directory move"
            );
        }

        let row = sqlx::query_as::<_, RenameEventRow>(&format!(
            r#"
            UPDATE rename_events
            SET status = 'processed', processed_at = NOW()
            WHERE id = $1
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(event_id)
        .fetch_one(&mut *conn)
        .await?;

        RenameEvent::try_from(row)
    }
}

#[async_trait]
impl RenameEventRepository for PostgresRenameEventRepository {
    async fn record_move(&self, request: &MoveRequest) -> Result<RenameEvent> {
        let mut tx = self.pool().begin().await?;

        let applied = Self::apply_move(&mut *tx, request).await;
        match applied {
            Ok(event) => {
                tx.commit().await?;
                Ok(event)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "rollback of failed move did not complete");
                }
                let mut conn = self.pool().acquire().await?;
                if let Err(record_err) =
                    Self::insert_event(&mut *conn, request, RenameStatus::Failed).await
                {
                    warn!(
                        old_path = %request.old_path,
                        new_path = %request.new_path,
                        error = %record_err,
                        "could not record failed rename event"
                    );
                }
                Err(err)
            }
        }
    }

    async fn counts(&self) -> Result<RenameCounts> {
        let (total, processed, failed) = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE status = 'processed'),
                COUNT(*) FILTER (WHERE status = 'failed')
            FROM rename_events
            "#,
        )
        .fetch_one(self.pool())
        .await?;

        Ok(RenameCounts {
            total,
            processed,
            failed,
        })
    }

    async fn recent(
        &self,
        root_id: Option<StorageRootId>,
        limit: i64,
    ) -> Result<Vec<RenameEvent>> {
        let rows = sqlx::query_as::<_, RenameEventRow>(&format!(
            r#"
            SELECT {EVENT_COLUMNS} FROM rename_events
            WHERE ($1::bigint IS NULL OR storage_root_id = $1)
            ORDER BY detected_at DESC, id DESC
            LIMIT $2
            "#
        ))
        .bind(root_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(RenameEvent::try_from).collect()
    }
}

#[derive(sqlx::FromRow)]
struct RenameEventRow {
    id: RenameEventId,
    storage_root_id: StorageRootId,
    old_path: String,
    new_path: String,
    is_directory: bool,
    size: i64,
    file_hash: Option<String>,
    detected_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    status: String,
}

impl TryFrom<RenameEventRow> for RenameEvent {
    type Error = CatalogError;

    fn try_from(row: RenameEventRow) -> Result<Self> {
        Ok(RenameEvent {
            id: row.id,
            storage_root_id: row.storage_root_id,
            old_path: row.old_path,
            new_path: row.new_path,
            is_directory: row.is_directory,
            size: row.size,
            file_hash: row.file_hash,
            detected_at: row.detected_at,
            processed_at: row.processed_at,
            status: row.status.parse()?,
        })
    }
}
