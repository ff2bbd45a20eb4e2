use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Sizing of the scan coordinator.
///
/// Every field has a default so a partial configuration file is enough.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Jobs the queue holds before `queue_scan` fails with `QueueFull`.
    pub queue_capacity: usize,
    /// Worker tasks pulling from the queue.
    pub worker_count: usize,
    /// Scans allowed to traverse at once, independent of `worker_count`.
    pub max_concurrent_scans: usize,
    /// How long a finished job's status stays queryable (ms).
    pub status_retention_ms: u64,
    /// How long `stop` lets in-flight jobs run before cancelling them (ms).
    pub shutdown_grace_ms: u64,
    /// Run the aggregation pipeline after each completed scan.
    pub aggregate_after_scan: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1_000,
            worker_count: 4,
            max_concurrent_scans: 4,
            status_retention_ms: 60_000,
            shutdown_grace_ms: 30_000,
            aggregate_after_scan: true,
        }
    }
}

impl CoordinatorConfig {
    pub fn status_retention(&self) -> Duration {
        Duration::from_millis(self.status_retention_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_remaining_defaults() {
        let config: CoordinatorConfig =
            serde_json::from_str(r#"{"worker_count": 2}"#).expect("config should parse");
        assert_eq!(config.worker_count, 2);
        assert_eq!(config.queue_capacity, 1_000);
        assert_eq!(config.max_concurrent_scans, 4);
        assert_eq!(config.status_retention(), Duration::from_secs(60));
    }
}
