use catalog_model::{ModelError, Protocol};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid model value: {0}")]
    Model(#[from] ModelError),

    #[error("scan queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("no scanner or client registered for protocol {0}")]
    UnsupportedProtocol(Protocol),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Filesystem error at {path}: {message}")]
    Filesystem { path: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CatalogError {
    pub fn filesystem(path: impl Into<String>, message: impl std::fmt::Display) -> Self {
        CatalogError::Filesystem {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CatalogError::Cancelled(_))
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
