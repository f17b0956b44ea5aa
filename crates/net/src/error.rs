use std::time::Duration;

/// Why the link to the authoritative server was abandoned.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("no async runtime available for the network link")]
    NoRuntime,
    #[error("health probe failed: {0}")]
    Probe(String),
    #[error("health probe timed out after {0:?}")]
    ProbeTimeout(Duration),
    #[error("server does not offer a websocket channel")]
    NoWebSocket,
    #[error("websocket error: {0}")]
    WebSocket(String),
    #[error("connection closed by server")]
    Closed,
    #[error("malformed message: {0}")]
    Decode(#[from] serde_json::Error),
}
