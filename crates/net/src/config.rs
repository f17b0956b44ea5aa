use serde::{Deserialize, Serialize};

/// Endpoints of the authoritative server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// WebSocket endpoint for input and snapshots.
    pub url: String,
    /// Health endpoint probed before connecting.
    pub health_url: String,
    pub probe_timeout_ms: u64,
    /// Snapshot batches held for the host before newer ones are dropped.
    pub snapshot_capacity: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8765".into(),
            health_url: "http://127.0.0.1:8000/health".into(),
            probe_timeout_ms: 800,
            snapshot_capacity: 32,
        }
    }
}
