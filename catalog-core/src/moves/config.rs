use std::collections::HashMap;
use std::time::Duration;

use catalog_model::Protocol;
use serde::{Deserialize, Serialize};

/// Tuning for delete/create pairing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MoveTrackerConfig {
    /// How long a deletion stays eligible to pair with a creation (milliseconds).
    pub move_window_ms: u64,
    /// Cadence of the background sweep that drops expired deletions (milliseconds).
    pub cleanup_interval_ms: u64,
    /// Upper bound on tracked deletions; the oldest is evicted beyond it.
    pub max_pending_moves: usize,
    /// Optional per-protocol windows overriding `move_window_ms`.
    pub protocol_windows_ms: HashMap<Protocol, u64>,
}

impl Default for MoveTrackerConfig {
    fn default() -> Self {
        Self {
            move_window_ms: 5_000,
            cleanup_interval_ms: 30_000,
            max_pending_moves: 10_000,
            protocol_windows_ms: HashMap::new(),
        }
    }
}

impl MoveTrackerConfig {
    /// Windows sized for each backend's listing latency: slow remote
    /// protocols need longer between observing the delete and the create.
    pub fn with_protocol_defaults(mut self) -> Self {
        self.protocol_windows_ms.extend([
            (Protocol::Local, 2_000),
            (Protocol::Smb, 10_000),
            (Protocol::Ftp, 30_000),
            (Protocol::Nfs, 5_000),
            (Protocol::Webdav, 15_000),
        ]);
        self
    }

    pub fn window_for(&self, protocol: Protocol) -> chrono::Duration {
        let ms = self
            .protocol_windows_ms
            .get(&protocol)
            .copied()
            .unwrap_or(self.move_window_ms);
        chrono::Duration::milliseconds(i64::try_from(ms).unwrap_or(i64::MAX))
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_override_beats_default_window() {
        let config = MoveTrackerConfig::default().with_protocol_defaults();
        assert_eq!(config.window_for(Protocol::Ftp), chrono::Duration::seconds(30));
        assert_eq!(config.window_for(Protocol::Local), chrono::Duration::seconds(2));

        let plain = MoveTrackerConfig::default();
        assert_eq!(plain.window_for(Protocol::Ftp), chrono::Duration::seconds(5));
    }
}
