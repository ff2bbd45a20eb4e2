use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use catalog_model::Protocol;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;
use tracing::debug;

use super::{FileSystemClient, RemoteFileInfo};
use crate::error::{CatalogError, Result};

/// Bytes read from the head of a file for the quick fingerprint.
const QUICK_HASH_BYTES: usize = 64 * 1024;

/// Client for a directory on the local machine, backed by `tokio::fs`.
#[derive(Debug, Clone)]
pub struct LocalClient {
    base: PathBuf,
}

impl LocalClient {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        let mut resolved = self.base.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => {
                    return Err(CatalogError::InvalidInput(format!(
                        "path escapes storage root: {path}"
                    )));
                }
            }
        }
        Ok(resolved)
    }
}

#[async_trait]
impl FileSystemClient for LocalClient {
    fn protocol(&self) -> Protocol {
        Protocol::Local
    }

    async fn connect(&self) -> Result<()> {
        let metadata = tokio::fs::metadata(&self.base).await.map_err(|e| {
            CatalogError::Connection(format!(
                "local root {} is not accessible: {e}",
                self.base.display()
            ))
        })?;
        if !metadata.is_dir() {
            return Err(CatalogError::Connection(format!(
                "local root {} is not a directory",
                self.base.display()
            )));
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }

    async fn list_directory(&self, path: &str) -> Result<Vec<RemoteFileInfo>> {
        let dir = self.resolve(path)?;
        let mut reader = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| CatalogError::filesystem(path, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| CatalogError::filesystem(path, e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            // Entries can vanish between readdir and stat.
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(err) => {
                    debug!(path = %path, entry = %name, error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            entries.push(RemoteFileInfo {
                name,
                is_dir: metadata.is_dir(),
                size: if metadata.is_dir() { 0 } else { metadata.len() },
                modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn fingerprint(&self, path: &str, size: u64) -> Result<Option<String>> {
        let file_path = self.resolve(path)?;
        let mut file = tokio::fs::File::open(&file_path)
            .await
            .map_err(|e| CatalogError::filesystem(path, e))?;

        let mut buffer = vec![0u8; QUICK_HASH_BYTES];
        let mut filled = 0;
        while filled < buffer.len() {
            let read = file
                .read(&mut buffer[filled..])
                .await
                .map_err(|e| CatalogError::filesystem(path, e))?;
            if read == 0 {
                break;
            }
            filled += read;
        }

        let mut hasher = Sha256::new();
        hasher.update(&buffer[..filled]);
        hasher.update(size.to_le_bytes());
        Ok(Some(hex::encode(hasher.finalize())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_entries_sorted_with_sizes() {
        let dir = tempfile::tempdir().expect("tempdir");
        tokio::fs::create_dir(dir.path().join("shows")).await.unwrap();
        tokio::fs::write(dir.path().join("b.txt"), b"hello").await.unwrap();
        tokio::fs::write(dir.path().join("a.txt"), b"hi").await.unwrap();

        let client = LocalClient::new(dir.path());
        client.connect().await.expect("connect");
        let entries = client.list_directory("/").await.expect("list");

        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "shows"]);
        assert_eq!(entries[1].size, 5);
        assert!(entries[2].is_dir);
        assert!(entries[0].modified.is_some());
    }

    #[tokio::test]
    async fn fingerprint_is_stable_and_content_sensitive() {
        let dir = tempfile::tempdir().expect("tempdir");
        tokio::fs::write(dir.path().join("one.bin"), b"same bytes").await.unwrap();
        tokio::fs::write(dir.path().join("two.bin"), b"same bytes").await.unwrap();
        tokio::fs::write(dir.path().join("three.bin"), b"other byte").await.unwrap();

        let client = LocalClient::new(dir.path());
        let one = client.fingerprint("/one.bin", 10).await.unwrap();
        let two = client.fingerprint("/two.bin", 10).await.unwrap();
        let three = client.fingerprint("/three.bin", 10).await.unwrap();

        assert!(one.is_some());
        assert_eq!(one, two);
        assert_ne!(one, three);
    }

    #[tokio::test]
    async fn rejects_parent_components() {
        let dir = tempfile::tempdir().expect("tempdir");
        let client = LocalClient::new(dir.path());
        let err = client.list_directory("/../etc").await.unwrap_err();
        assert!(matches!(err, CatalogError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn connect_fails_for_missing_base() {
        let dir = tempfile::tempdir().expect("tempdir");
        let client = LocalClient::new(dir.path().join("missing"));
        assert!(matches!(
            client.connect().await,
            Err(CatalogError::Connection(_))
        ));
    }
}
