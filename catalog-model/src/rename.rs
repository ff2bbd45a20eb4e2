use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::ModelError;
use crate::ids::{RenameEventId, StorageRootId};

/// Lifecycle of a persisted rename event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RenameStatus {
    Pending,
    Processed,
    Failed,
}

impl RenameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenameStatus::Pending => "pending",
            RenameStatus::Processed => "processed",
            RenameStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RenameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenameStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RenameStatus::Pending),
            "processed" => Ok(RenameStatus::Processed),
            "failed" => Ok(RenameStatus::Failed),
            other => Err(ModelError::UnknownVariant {
                kind: "rename status",
                value: other.to_string(),
            }),
        }
    }
}

/// Append-only audit record of a detected move.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RenameEvent {
    pub id: RenameEventId,
    pub storage_root_id: StorageRootId,
    pub old_path: String,
    pub new_path: String,
    pub is_directory: bool,
    pub size: i64,
    pub file_hash: Option<String>,
    pub detected_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub status: RenameStatus,
}
