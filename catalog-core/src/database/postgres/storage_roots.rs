use async_trait::async_trait;
use catalog_model::{StorageRoot, StorageRootId};
use sqlx::PgPool;

use crate::database::ports::StorageRootRepository;
use crate::error::{CatalogError, Result};

const ROOT_COLUMNS: &str = r#"
    id, name, protocol, host, port, path, username, password, domain,
    mount_point, options, url, enabled, max_depth, include_patterns, exclude_patterns
"#;

#[derive(Clone, Debug)]
pub struct PostgresStorageRootRepository {
    pool: PgPool,
}

impl PostgresStorageRootRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl StorageRootRepository for PostgresStorageRootRepository {
    async fn get_by_name(&self, name: &str) -> Result<Option<StorageRoot>> {
        let row = sqlx::query_as::<_, StorageRootRow>(&format!(
            "SELECT {ROOT_COLUMNS} FROM storage_roots WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(self.pool())
        .await?;

        row.map(StorageRoot::try_from).transpose()
    }

    async fn insert_if_absent(&self, root: &StorageRoot) -> Result<Option<StorageRootId>> {
        let id = sqlx::query_scalar::<_, StorageRootId>(
            r#"
            INSERT INTO storage_roots (
                name, protocol, host, port, path, username, password, domain,
                mount_point, options, url, enabled, max_depth,
                include_patterns, exclude_patterns
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (name) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&root.name)
        .bind(root.protocol.as_str())
        .bind(&root.host)
        .bind(root.port.map(i32::from))
        .bind(&root.path)
        .bind(&root.username)
        .bind(&root.password)
        .bind(&root.domain)
        .bind(&root.mount_point)
        .bind(&root.options)
        .bind(&root.url)
        .bind(root.enabled)
        .bind(depth_to_db(root.max_depth))
        .bind(&root.include_patterns)
        .bind(&root.exclude_patterns)
        .fetch_optional(self.pool())
        .await?;

        Ok(id)
    }

    async fn save(&self, root: &StorageRoot) -> Result<StorageRootId> {
        let id = sqlx::query_scalar::<_, StorageRootId>(
            r#"
            INSERT INTO storage_roots (
                name, protocol, host, port, path, username, password, domain,
                mount_point, options, url, enabled, max_depth,
                include_patterns, exclude_patterns
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (name) DO UPDATE SET
                protocol = EXCLUDED.protocol,
                host = EXCLUDED.host,
                port = EXCLUDED.port,
                path = EXCLUDED.path,
                username = EXCLUDED.username,
                password = EXCLUDED.password,
                domain = EXCLUDED.domain,
                mount_point = EXCLUDED.mount_point,
                options = EXCLUDED.options,
                url = EXCLUDED.url,
                enabled = EXCLUDED.enabled,
                max_depth = EXCLUDED.max_depth,
                include_patterns = EXCLUDED.include_patterns,
                exclude_patterns = EXCLUDED.exclude_patterns,
                updated_at = NOW()
            RETURNING id
            "#,
        )
        .bind(&root.name)
        .bind(root.protocol.as_str())
        .bind(&root.host)
        .bind(root.port.map(i32::from))
        .bind(&root.path)
        .bind(&root.username)
        .bind(&root.password)
        .bind(&root.domain)
        .bind(&root.mount_point)
        .bind(&root.options)
        .bind(&root.url)
        .bind(root.enabled)
        .bind(depth_to_db(root.max_depth))
        .bind(&root.include_patterns)
        .bind(&root.exclude_patterns)
        .fetch_one(self.pool())
        .await?;

        Ok(id)
    }

    async fn list(&self) -> Result<Vec<StorageRoot>> {
        let rows = sqlx::query_as::<_, StorageRootRow>(&format!(
            "SELECT {ROOT_COLUMNS} FROM storage_roots ORDER BY name"
        ))
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(StorageRoot::try_from).collect()
    }
}

fn depth_to_db(depth: u32) -> i32 {
    i32::try_from(depth).unwrap_or(i32::MAX)
}

#[derive(sqlx::FromRow)]
struct StorageRootRow {
    id: StorageRootId,
    name: String,
    protocol: String,
    host: Option<String>,
    port: Option<i32>,
    path: Option<String>,
    username: Option<String>,
    password: Option<String>,
    domain: Option<String>,
    mount_point: Option<String>,
    options: Option<String>,
    url: Option<String>,
    enabled: bool,
    max_depth: i32,
    include_patterns: Vec<String>,
    exclude_patterns: Vec<String>,
}

impl TryFrom<StorageRootRow> for StorageRoot {
    type Error = CatalogError;

    fn try_from(row: StorageRootRow) -> Result<Self> {
        let port = row
            .port
            .map(|port| {
                u16::try_from(port).map_err(|_| {
                    CatalogError::InvalidInput(format!(
                        "storage root {} has out-of-range port {port}",
                        row.name
                    ))
                })
            })
            .transpose()?;

        Ok(StorageRoot {
            id: Some(row.id),
            protocol: row.protocol.parse()?,
            name: row.name,
            host: row.host,
            port,
            path: row.path,
            username: row.username,
            password: row.password,
            domain: row.domain,
            mount_point: row.mount_point,
            options: row.options,
            url: row.url,
            enabled: row.enabled,
            max_depth: u32::try_from(row.max_depth).unwrap_or(0),
            include_patterns: row.include_patterns,
            exclude_patterns: row.exclude_patterns,
        })
    }
}
