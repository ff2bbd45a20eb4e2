use std::collections::HashSet;

use anyhow::{Context, bail};
use catalog_core::{AggregationConfig, CoordinatorConfig, MoveTrackerConfig, StorageConfig};
use catalog_model::StorageRoot;
use serde::{Deserialize, Serialize};

/// Everything the scan daemon needs to run.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub database: DatabaseConfig,
    pub scanner: ScannerConfig,
    /// Roots queued for a full scan at startup (when enabled).
    pub storage_roots: Vec<StorageRoot>,
    /// `tracing-subscriber` filter used when `RUST_LOG` is unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Scanner tuning, one section per core service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub coordinator: CoordinatorConfig,
    pub moves: MoveTrackerConfig,
    pub aggregation: AggregationConfig,
    /// Seed per-protocol move windows before applying `moves.protocol_windows_ms`.
    pub protocol_move_windows: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            coordinator: CoordinatorConfig::default(),
            moves: MoveTrackerConfig::default(),
            aggregation: AggregationConfig::default(),
            protocol_move_windows: true,
        }
    }
}

impl ScannerConfig {
    /// Move tracker settings with protocol defaults merged under any
    /// explicitly configured windows.
    pub fn move_tracker_config(&self) -> MoveTrackerConfig {
        if !self.protocol_move_windows {
            return self.moves.clone();
        }
        let mut moves = self.moves.clone();
        let explicit = std::mem::take(&mut moves.protocol_windows_ms);
        let mut moves = moves.with_protocol_defaults();
        moves.protocol_windows_ms.extend(explicit);
        moves
    }
}

impl CatalogConfig {
    /// Reject settings the daemon cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let coordinator = &self.scanner.coordinator;
        if coordinator.queue_capacity == 0 {
            bail!("scanner.coordinator.queue_capacity must be greater than zero");
        }
        if coordinator.worker_count == 0 {
            bail!("scanner.coordinator.worker_count must be greater than zero");
        }
        if coordinator.max_concurrent_scans == 0 {
            bail!("scanner.coordinator.max_concurrent_scans must be greater than zero");
        }
        if self.database.max_connections == 0 {
            bail!("database.max_connections must be greater than zero");
        }

        let mut names = HashSet::new();
        for root in &self.storage_roots {
            if root.name.trim().is_empty() {
                bail!("storage root names must not be empty");
            }
            if !names.insert(root.name.as_str()) {
                bail!("storage root '{}' is defined more than once", root.name);
            }
            StorageConfig::from_root(root)
                .validate()
                .with_context(|| format!("storage root '{}'", root.name))?;
        }
        Ok(())
    }

    pub fn enabled_roots(&self) -> impl Iterator<Item = &StorageRoot> {
        self.storage_roots.iter().filter(|root| root.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_model::Protocol;

    #[test]
    fn explicit_protocol_window_wins_over_default() {
        let mut scanner = ScannerConfig::default();
        scanner.moves.protocol_windows_ms.insert(Protocol::Ftp, 1_000);

        let moves = scanner.move_tracker_config();
        assert_eq!(moves.protocol_windows_ms.get(&Protocol::Ftp), Some(&1_000));
        assert_eq!(moves.protocol_windows_ms.get(&Protocol::Smb), Some(&10_000));

        scanner.protocol_move_windows = false;
        let moves = scanner.move_tracker_config();
        assert_eq!(moves.protocol_windows_ms.len(), 1);
    }

    #[test]
    fn duplicate_root_names_are_rejected() {
        let config = CatalogConfig {
            storage_roots: vec![
                StorageRoot::local("media", "/srv/a"),
                StorageRoot::local("media", "/srv/b"),
            ],
            ..CatalogConfig::default()
        };
        let err = config.validate().expect_err("duplicates should fail");
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn incomplete_remote_root_is_rejected() {
        let config = CatalogConfig {
            storage_roots: vec![StorageRoot::new("nas", Protocol::Smb)],
            ..CatalogConfig::default()
        };
        let err = config.validate().expect_err("smb root without host should fail");
        assert!(format!("{err:#}").contains("nas"));
    }

    #[test]
    fn database_url_is_redacted_in_debug() {
        let database = DatabaseConfig {
            url: Some("postgres://catalog:secret@db/catalog".into()),
            ..DatabaseConfig::default()
        };
        assert!(!format!("{database:?}").contains("secret"));
    }
}
