use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identifier for a simulated body.
///
/// Opaque to the simulation; the host decides the format. Snapshot
/// reconciliation matches on exact equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BodyId(pub String);

impl BodyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random id for bodies the host has no name for.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BodyId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for BodyId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Authoritative state for one body, as published by a remote simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct BodySnapshot {
    pub id: BodyId,
    pub position: Vec3,
    pub velocity: Vec3,
}

/// A single controller input, forwarded to the remote simulation as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEvent {
    pub id: BodyId,
    pub key: String,
    /// Milliseconds since the Unix epoch.
    pub ts: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let a = BodyId::generate();
        let b = BodyId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn body_id_serializes_as_plain_string() {
        let id = BodyId::from("rover-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"rover-1\"");
        assert_eq!(id.to_string(), "rover-1");
    }

    #[test]
    fn input_event_wire_shape() {
        let event = InputEvent {
            id: "rover-1".into(),
            key: "w".into(),
            ts: 1_700_000_000_000,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["id"], "rover-1");
        assert_eq!(json["key"], "w");
        assert_eq!(json["ts"], 1_700_000_000_000u64);
    }
}
