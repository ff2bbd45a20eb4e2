//! Core data model definitions shared across the catalog crates.
#![allow(missing_docs)]

pub use ::chrono;

pub mod error;
pub mod files;
pub mod ids;
pub mod media;
pub mod protocol;
pub mod rename;
pub mod scan;
pub mod storage;

pub use error::{ModelError, Result as ModelResult};
pub use files::{FileRecord, FileType, NewFileRecord};
pub use ids::{
    FileId, MediaItemId, MediaTypeId, RenameEventId, ScanJobId, StorageRootId,
};
pub use media::{
    DirectoryAnalysis, MediaFileLink, MediaItem, MediaKind, NewMediaItem,
};
pub use protocol::Protocol;
pub use rename::{RenameEvent, RenameStatus};
pub use scan::{ScanState, ScanStatusSnapshot, ScanType};
pub use storage::StorageRoot;
