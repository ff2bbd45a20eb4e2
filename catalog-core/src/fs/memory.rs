use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use catalog_model::Protocol;
use chrono::{DateTime, Utc};

use super::{FileSystemClient, RemoteFileInfo};
use crate::error::{CatalogError, Result};
use crate::paths;

/// In-memory client for tests and dry runs.
///
/// Clones share the same tree, so a test can keep a handle, mutate the tree
/// between scans, and hand clones to a factory. Paths are absolute and
/// slash-separated; parents are created implicitly.
#[derive(Debug, Clone)]
pub struct InMemoryClient {
    protocol: Protocol,
    state: Arc<Mutex<MemoryTree>>,
}

#[derive(Debug, Default)]
struct MemoryTree {
    nodes: BTreeMap<String, Node>,
    failing_listings: HashSet<String>,
    fail_connect: bool,
    list_delay: Option<Duration>,
    connects: usize,
    disconnects: usize,
}

#[derive(Debug, Clone)]
struct Node {
    is_dir: bool,
    size: u64,
    modified: Option<DateTime<Utc>>,
    fingerprint: Option<String>,
}

impl Node {
    fn dir() -> Self {
        Self {
            is_dir: true,
            size: 0,
            modified: None,
            fingerprint: None,
        }
    }
}

impl InMemoryClient {
    pub fn new(protocol: Protocol) -> Self {
        Self {
            protocol,
            state: Arc::new(Mutex::new(MemoryTree::default())),
        }
    }

    fn tree(&self) -> MutexGuard<'_, MemoryTree> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_dir(&self, path: &str) {
        let mut tree = self.tree();
        tree.ensure_parents(path);
        tree.nodes.entry(normalize(path)).or_insert_with(Node::dir);
    }

    pub fn add_file(&self, path: &str, size: u64) {
        self.insert_file(path, size, None);
    }

    /// Add a file whose fingerprint the client reports.
    pub fn add_file_with_fingerprint(&self, path: &str, size: u64, fingerprint: &str) {
        self.insert_file(path, size, Some(fingerprint.to_string()));
    }

    fn insert_file(&self, path: &str, size: u64, fingerprint: Option<String>) {
        let mut tree = self.tree();
        tree.ensure_parents(path);
        tree.nodes.insert(
            normalize(path),
            Node {
                is_dir: false,
                size,
                modified: Some(Utc::now()),
                fingerprint,
            },
        );
    }

    /// Remove `path` and everything below it.
    pub fn remove(&self, path: &str) {
        let path = normalize(path);
        self.tree()
            .nodes
            .retain(|candidate, _| !paths::is_within(candidate, &path));
    }

    /// Move `from` (and its subtree) to `to`.
    pub fn rename(&self, from: &str, to: &str) {
        let from = normalize(from);
        let to = normalize(to);
        let mut tree = self.tree();
        let moved: Vec<(String, Node)> = tree
            .nodes
            .iter()
            .filter(|(candidate, _)| paths::is_within(candidate, &from))
            .map(|(candidate, node)| (candidate.clone(), node.clone()))
            .collect();
        for (old_path, _) in &moved {
            tree.nodes.remove(old_path);
        }
        tree.ensure_parents(&to);
        for (old_path, node) in moved {
            if let Some(new_path) = paths::rebase(&old_path, &from, &to) {
                tree.nodes.insert(new_path, node);
            }
        }
    }

    /// Make every listing of `path` fail.
    pub fn fail_listing(&self, path: &str) {
        self.tree().failing_listings.insert(normalize(path));
    }

    pub fn fail_connect(&self, fail: bool) {
        self.tree().fail_connect = fail;
    }

    /// Delay applied to every listing, to keep jobs in flight.
    pub fn set_list_delay(&self, delay: Option<Duration>) {
        self.tree().list_delay = delay;
    }

    pub fn connect_count(&self) -> usize {
        self.tree().connects
    }

    pub fn disconnect_count(&self) -> usize {
        self.tree().disconnects
    }
}

impl MemoryTree {
    fn ensure_parents(&mut self, path: &str) {
        let mut current = paths::parent(path);
        while let Some(dir) = current {
            if dir == "/" {
                break;
            }
            self.nodes.entry(dir.to_string()).or_insert_with(Node::dir);
            current = paths::parent(dir);
        }
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

#[async_trait]
impl FileSystemClient for InMemoryClient {
    fn protocol(&self) -> Protocol {
        self.protocol
    }

    async fn connect(&self) -> Result<()> {
        let mut tree = self.tree();
        if tree.fail_connect {
            return Err(CatalogError::Connection(format!(
                "{} connection refused",
                self.protocol
            )));
        }
        tree.connects += 1;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.tree().disconnects += 1;
        Ok(())
    }

    async fn list_directory(&self, path: &str) -> Result<Vec<RemoteFileInfo>> {
        let delay = self.tree().list_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let dir = normalize(path);
        let tree = self.tree();
        if tree.failing_listings.contains(&dir) {
            return Err(CatalogError::filesystem(dir, "listing refused"));
        }
        if dir != "/" {
            match tree.nodes.get(&dir) {
                Some(node) if node.is_dir => {}
                Some(_) => return Err(CatalogError::filesystem(dir, "not a directory")),
                None => return Err(CatalogError::filesystem(dir, "no such directory")),
            }
        }

        Ok(tree
            .nodes
            .iter()
            .filter(|(candidate, _)| paths::parent(candidate) == Some(dir.as_str()))
            .map(|(candidate, node)| RemoteFileInfo {
                name: paths::file_name(candidate).to_string(),
                is_dir: node.is_dir,
                size: node.size,
                modified: node.modified,
            })
            .collect())
    }

    async fn fingerprint(&self, path: &str, _size: u64) -> Result<Option<String>> {
        Ok(self
            .tree()
            .nodes
            .get(&normalize(path))
            .and_then(|node| node.fingerprint.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_direct_children_only() {
        let client = InMemoryClient::new(Protocol::Local);
        client.add_file("/movies/Heat (1995)/heat.mkv", 100);
        client.add_file("/notes.txt", 3);

        let root = client.list_directory("/").await.unwrap();
        let names: Vec<_> = root.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["movies", "notes.txt"]);

        let movies = client.list_directory("/movies").await.unwrap();
        assert_eq!(movies.len(), 1);
        assert!(movies[0].is_dir);
    }

    #[tokio::test]
    async fn rename_moves_subtree() {
        let client = InMemoryClient::new(Protocol::Local);
        client.add_file("/test_dir/nested_file.txt", 10);
        client.rename("/test_dir", "/moved_dir");

        assert!(client.list_directory("/test_dir").await.is_err());
        let moved = client.list_directory("/moved_dir").await.unwrap();
        assert_eq!(moved[0].name, "nested_file.txt");
    }

    #[tokio::test]
    async fn injected_failures_surface_as_errors() {
        let client = InMemoryClient::new(Protocol::Ftp);
        client.add_dir("/broken");
        client.fail_listing("/broken");
        client.fail_connect(true);

        assert!(client.connect().await.is_err());
        assert!(client.list_directory("/broken").await.is_err());
        assert!(client.list_directory("/").await.is_ok());
    }
}
