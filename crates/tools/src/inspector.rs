use glam::Vec3;
use std::fmt;
use twinsim_common::BodyId;
use twinsim_router::{InitStatus, Mode, Router};

/// Read-only queries against a running simulation, for debugging and
/// development UI.
pub struct SimulationInspector;

impl SimulationInspector {
    pub fn summary(router: &Router) -> SimulationSummary {
        SimulationSummary {
            mode: router.mode(),
            backend: router.active_backend_name(),
            native: router.init_status(),
            tick: router.tick(),
            bodies: router.world().len(),
            native_bodies: router.native_backend().map_or(0, |n| n.body_count()),
            fallback_notices: router.fallback_notices(),
        }
    }

    pub fn inspect_body(router: &Router, id: &BodyId) -> Option<BodyInfo> {
        router.body(id).map(|b| BodyInfo {
            id: b.id().clone(),
            position: b.position(),
            velocity: b.velocity(),
            target_velocity: b.target_velocity(),
            server_position: b.server_position(),
            is_static: b.is_static(),
        })
    }

    /// Registered ids in step order.
    pub fn list_bodies(router: &Router) -> Vec<BodyId> {
        router.world().ids().cloned().collect()
    }
}

#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub mode: Mode,
    pub backend: &'static str,
    pub native: InitStatus,
    pub tick: u64,
    pub bodies: usize,
    pub native_bodies: usize,
    pub fallback_notices: usize,
}

impl fmt::Display for SimulationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Simulation: mode={} backend={} native={} tick={} bodies={} native_bodies={}",
            self.mode, self.backend, self.native, self.tick, self.bodies, self.native_bodies
        )
    }
}

#[derive(Debug, Clone)]
pub struct BodyInfo {
    pub id: BodyId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub target_velocity: Vec3,
    pub server_position: Option<Vec3>,
    pub is_static: bool,
}

impl fmt::Display for BodyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.position;
        let v = self.velocity;
        write!(
            f,
            "Body [{}] pos=({:.2}, {:.2}, {:.2}) vel=({:.2}, {:.2}, {:.2})",
            self.id, p.x, p.y, p.z, v.x, v.y, v.z
        )?;
        if self.is_static {
            f.write_str(" static")?;
        }
        if let Some(s) = self.server_position {
            write!(f, " server=({:.2}, {:.2}, {:.2})", s.x, s.y, s.z)?;
        }
        Ok(())
    }
}
