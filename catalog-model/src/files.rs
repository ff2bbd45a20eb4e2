use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::ModelError;
use crate::ids::{FileId, StorageRootId};

/// Coarse content category derived from a file's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FileType {
    Video,
    Audio,
    Image,
    Book,
    Software,
    Archive,
    Document,
    Code,
    Directory,
    Other,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Video => "video",
            FileType::Audio => "audio",
            FileType::Image => "image",
            FileType::Book => "book",
            FileType::Software => "software",
            FileType::Archive => "archive",
            FileType::Document => "document",
            FileType::Code => "code",
            FileType::Directory => "directory",
            FileType::Other => "other",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "video" => FileType::Video,
            "audio" => FileType::Audio,
            "image" => FileType::Image,
            "book" => FileType::Book,
            "software" => FileType::Software,
            "archive" => FileType::Archive,
            "document" => FileType::Document,
            "code" => FileType::Code,
            "directory" => FileType::Directory,
            "other" => FileType::Other,
            other => {
                return Err(ModelError::UnknownVariant {
                    kind: "file type",
                    value: other.to_string(),
                });
            }
        })
    }
}

/// One catalogued path under a storage root.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileRecord {
    pub id: FileId,
    pub storage_root_id: StorageRootId,
    pub path: String,
    pub name: String,
    pub extension: Option<String>,
    pub mime_type: Option<String>,
    pub file_type: FileType,
    pub size: i64,
    pub is_directory: bool,
    pub parent_id: Option<FileId>,
    pub quick_hash: Option<String>,
    pub modified_at: Option<DateTime<Utc>>,
    pub last_scan_at: DateTime<Utc>,
    pub deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Values written by an upsert keyed on `(storage_root_id, path)`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFileRecord {
    pub storage_root_id: StorageRootId,
    pub path: String,
    pub name: String,
    pub extension: Option<String>,
    pub mime_type: Option<String>,
    pub file_type: FileType,
    pub size: i64,
    pub is_directory: bool,
    pub parent_id: Option<FileId>,
    pub quick_hash: Option<String>,
    pub modified_at: Option<DateTime<Utc>>,
    pub last_scan_at: DateTime<Utc>,
}
