use glam::Vec3;
use std::collections::BTreeMap;
use twinsim_common::{BodyId, BodySnapshot};

use crate::body::RigidBody;

/// The simulation context: every registered body plus the tick counter.
///
/// Owned by the host and passed by reference to whatever steps it, so several
/// independent simulations can coexist and be torn down cleanly. Uses BTreeMap
/// for deterministic iteration order across platforms.
#[derive(Debug, Clone, Default)]
pub struct World {
    bodies: BTreeMap<BodyId, RigidBody>,
    tick: u64,
}

impl World {
    /// Create an empty world at tick 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed steps.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn contains(&self, id: &BodyId) -> bool {
        self.bodies.contains_key(id)
    }

    /// Insert a body. Returns false, leaving the existing body untouched, if
    /// the id is already present.
    pub fn insert(&mut self, body: RigidBody) -> bool {
        if self.bodies.contains_key(body.id()) {
            return false;
        }
        self.bodies.insert(body.id().clone(), body);
        true
    }

    /// Remove a body. Returns it if it existed.
    pub fn remove(&mut self, id: &BodyId) -> Option<RigidBody> {
        self.bodies.remove(id)
    }

    pub fn get(&self, id: &BodyId) -> Option<&RigidBody> {
        self.bodies.get(id)
    }

    pub fn get_mut(&mut self, id: &BodyId) -> Option<&mut RigidBody> {
        self.bodies.get_mut(id)
    }

    /// Bodies in id order.
    pub fn iter(&self) -> impl Iterator<Item = &RigidBody> {
        self.bodies.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RigidBody> {
        self.bodies.values_mut()
    }

    pub fn ids(&self) -> impl Iterator<Item = &BodyId> {
        self.bodies.keys()
    }

    /// Mark one step as completed.
    pub fn advance_tick(&mut self) {
        self.tick += 1;
    }

    /// Stage authoritative state on every body whose id matches. Unknown ids
    /// are ignored. Returns the number of bodies updated.
    pub fn apply_snapshot(&mut self, snapshot: &[BodySnapshot]) -> usize {
        let mut matched = 0;
        for state in snapshot {
            match self.bodies.get_mut(&state.id) {
                Some(body) => {
                    body.stage_server_state(state.position, state.velocity);
                    matched += 1;
                }
                None => tracing::trace!(id = %state.id, "snapshot for unregistered body"),
            }
        }
        matched
    }

    /// Deterministic hash of tick and body kinematics, for comparing runs.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325; // FNV offset basis
        let mix = |h: &mut u64, bytes: &[u8]| {
            for &b in bytes {
                *h ^= b as u64;
                *h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        let mix_vec = |h: &mut u64, v: Vec3| {
            for c in v.to_array() {
                mix(h, &c.to_le_bytes());
            }
        };
        mix(&mut h, &self.tick.to_le_bytes());
        for (id, body) in &self.bodies {
            mix(&mut h, id.as_str().as_bytes());
            mix_vec(&mut h, body.position());
            mix_vec(&mut h, body.velocity());
        }
        h
    }
}

/// Whatever visual representation owns a body's on-screen position.
///
/// The only obligation the simulation places on a renderer: accept the
/// latest position for each body once per frame.
pub trait PositionSink {
    fn sync_position(&mut self, id: &BodyId, position: Vec3);
}

/// Headless hosts with nothing to draw.
impl PositionSink for () {
    fn sync_position(&mut self, _id: &BodyId, _position: Vec3) {}
}

impl PositionSink for BTreeMap<BodyId, Vec3> {
    fn sync_position(&mut self, id: &BodyId, position: Vec3) {
        self.insert(id.clone(), position);
    }
}
