use glam::Vec3;
use serde::{Deserialize, Serialize};
use twinsim_common::{BodyId, BodySnapshot, InputEvent};

use crate::error::NetError;

/// `{x, y, z}` as it appears on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WireVec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<Vec3> for WireVec3 {
    fn from(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

impl From<WireVec3> for Vec3 {
    fn from(v: WireVec3) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

/// One body's entry in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireBody {
    pub id: BodyId,
    pub position: WireVec3,
    #[serde(default)]
    pub velocity: WireVec3,
}

impl From<WireBody> for BodySnapshot {
    fn from(body: WireBody) -> Self {
        Self {
            id: body.id,
            position: body.position.into(),
            velocity: body.velocity.into(),
        }
    }
}

/// Client → server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum ClientMessage {
    Input(InputEvent),
}

/// Server → client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum ServerMessage {
    Snapshot(Vec<WireBody>),
}

impl ServerMessage {
    pub fn decode(text: &str) -> Result<Self, NetError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn into_snapshots(self) -> Vec<BodySnapshot> {
        match self {
            Self::Snapshot(bodies) => bodies.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_wire_shape() {
        let msg = ClientMessage::Input(InputEvent {
            id: "rover".into(),
            key: "w".into(),
            ts: 42,
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "input");
        assert_eq!(json["payload"]["id"], "rover");
        assert_eq!(json["payload"]["key"], "w");
        assert_eq!(json["payload"]["ts"], 42);
    }

    #[test]
    fn snapshot_decodes_into_body_states() {
        let text = r#"{"type":"snapshot","payload":[
            {"id":"rover","position":{"x":1,"y":2,"z":3},"velocity":{"x":0,"y":1.5,"z":0}},
            {"id":"crate","position":{"x":-1,"y":0,"z":0.5}}
        ]}"#;
        let snapshots = ServerMessage::decode(text).unwrap().into_snapshots();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].id, BodyId::from("rover"));
        assert_eq!(snapshots[0].position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(snapshots[0].velocity, Vec3::new(0.0, 1.5, 0.0));
        // Missing velocity reads as rest.
        assert_eq!(snapshots[1].velocity, Vec3::ZERO);
    }

    #[test]
    fn unknown_message_type_is_an_error() {
        let err = ServerMessage::decode(r#"{"type":"chat","payload":"hi"}"#).unwrap_err();
        assert!(matches!(err, NetError::Decode(_)));
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(ServerMessage::decode("not json").is_err());
    }
}
