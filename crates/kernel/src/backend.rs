use glam::Vec3;
use twinsim_common::BodyId;

use crate::body::RigidBody;
use crate::error::BodyFault;
use crate::integrator::{Integrator, IntegratorConfig};
use crate::world::World;

/// Outcome of one backend step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    /// Bodies skipped this tick.
    pub faults: Vec<BodyFault>,
}

impl StepReport {
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}

/// Interchangeable physics strategy behind one stepping interface.
///
/// Bodies live in the [`World`]; a backend may mirror them in its own engine
/// but must write results back through [`RigidBody::sync_from_backend`].
pub trait PhysicsBackend: Send + 'static {
    /// Human-readable backend name (e.g. "analytic", "rapier3d").
    fn name(&self) -> &'static str;

    /// Mirror a newly registered body. Must be idempotent by id.
    fn create_body(&mut self, body: &RigidBody);

    /// Release a body's engine-side counterpart. Unknown ids are ignored.
    fn remove_body(&mut self, id: &BodyId);

    /// Advance every body in `world` by `dt` and consume their accumulators.
    fn step(&mut self, world: &mut World, dt: f32) -> StepReport;

    fn apply_force(&mut self, body: &mut RigidBody, force: Vec3) {
        body.apply_force(force);
    }

    fn apply_torque(&mut self, body: &mut RigidBody, torque: Vec3) {
        body.apply_torque(torque);
    }
}

/// The in-process analytic integrator as a backend. Always available.
#[derive(Debug, Clone, Default)]
pub struct AnalyticBackend {
    integrator: Integrator,
}

impl AnalyticBackend {
    pub fn new(config: IntegratorConfig) -> Self {
        Self {
            integrator: Integrator::new(config),
        }
    }

    pub fn integrator(&self) -> &Integrator {
        &self.integrator
    }
}

impl PhysicsBackend for AnalyticBackend {
    fn name(&self) -> &'static str {
        "analytic"
    }

    // Bodies already live in the world; nothing to mirror.
    fn create_body(&mut self, _body: &RigidBody) {}

    fn remove_body(&mut self, _id: &BodyId) {}

    fn step(&mut self, world: &mut World, dt: f32) -> StepReport {
        StepReport {
            faults: self.integrator.step(world, dt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyOptions;

    #[test]
    fn trait_is_object_safe() {
        fn _accepts_boxed(_: Box<dyn PhysicsBackend>) {}
    }

    #[test]
    fn forces_through_backend_reach_the_body() {
        let mut backend = AnalyticBackend::default();
        let mut world = World::new();
        world.insert(
            RigidBody::new(
                "sled".into(),
                Vec3::ZERO,
                BodyOptions {
                    use_gravity: false,
                    ..BodyOptions::default()
                },
            )
            .unwrap(),
        );

        let body = world.get_mut(&"sled".into()).unwrap();
        backend.apply_force(body, Vec3::new(60.0, 0.0, 0.0));
        backend.apply_torque(body, Vec3::Z);

        let report = backend.step(&mut world, 1.0 / 60.0);
        assert!(report.is_clean());

        let sled = world.get(&"sled".into()).unwrap();
        assert!(sled.velocity().x > 0.0);
        assert_eq!(sled.force(), Vec3::ZERO);
        assert_eq!(sled.torque(), Vec3::ZERO);
        assert_eq!(sled.last_applied_torque(), Vec3::Z);
        assert_eq!(world.tick(), 1);
    }

    #[test]
    fn analytic_backend_reports_name() {
        assert_eq!(AnalyticBackend::default().name(), "analytic");
    }
}
