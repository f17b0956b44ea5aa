use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::body::{MotorGains, RigidBody};
use crate::error::BodyFault;
use crate::world::World;

/// Environment and motor tuning for the analytic integrator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegratorConfig {
    /// Vertical (Z) gravitational acceleration, m/s².
    pub gravity: f32,
    /// Fluid surface height. Buoyancy is off when unset.
    pub fluid_level: Option<f32>,
    pub buoyancy_coefficient: f32,
    /// Clamp bodies to the z = 0 ground plane.
    pub ground: bool,
    /// Vertical speeds below this after a ground bounce are zeroed.
    pub ground_rest_threshold: f32,
    /// Pairs of bodies closer than this are in contact.
    pub contact_radius: f32,
    pub motor: MotorGains,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            gravity: -9.81,
            fluid_level: None,
            buoyancy_coefficient: 0.8,
            ground: true,
            ground_rest_threshold: 0.1,
            contact_radius: 1.5,
            motor: MotorGains::default(),
        }
    }
}

/// In-process analytic integrator: semi-implicit Euler with a velocity
/// motor, drag, buoyancy, naive pairwise contacts and a ground plane.
#[derive(Debug, Clone, Default)]
pub struct Integrator {
    config: IntegratorConfig,
}

impl Integrator {
    pub fn new(config: IntegratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IntegratorConfig {
        &self.config
    }

    /// Advance every body in the world by `dt`.
    ///
    /// A body whose update fails is skipped for this tick and reported; the
    /// rest of the step proceeds.
    pub fn step(&self, world: &mut World, dt: f32) -> Vec<BodyFault> {
        let _span = tracing::trace_span!("integrate", tick = world.tick()).entered();
        let mut faults = Vec::new();

        for body in world.iter_mut() {
            self.apply_buoyancy(body);
            if let Err(fault) = self.integrate(body, dt) {
                tracing::warn!(%fault, "body skipped for this tick");
                faults.push(fault);
            }
        }

        let mut bodies: Vec<&mut RigidBody> = world.iter_mut().collect();
        self.resolve_collisions(&mut bodies);
        if self.config.ground {
            for body in bodies.iter_mut() {
                body.settle_on_ground(self.config.ground_rest_threshold);
            }
        }

        world.advance_tick();
        faults
    }

    /// Advance one body. Static bodies only have their accumulators cleared.
    pub fn integrate(&self, body: &mut RigidBody, dt: f32) -> Result<(), BodyFault> {
        if body.is_static() {
            body.take_accumulators();
            return Ok(());
        }

        let motor = body.drive_motor(dt, &self.config.motor);
        let (force, _torque) = body.take_accumulators();

        let mut acceleration = (force + motor) / body.mass();
        if body.uses_gravity() {
            acceleration.z += self.config.gravity;
        }

        let velocity = (body.velocity() + acceleration * dt) * (1.0 - body.drag());
        let mut position = body.position() + velocity * dt;

        // Exponential convergence toward authority, never a hard snap.
        if let Some(server) = body.server_position() {
            position += (server - position) * body.reconciliation_alpha();
        }

        if !(position.is_finite() && velocity.is_finite()) {
            return Err(BodyFault::NonFinite(body.id().clone()));
        }
        body.set_kinematics(position, velocity);
        Ok(())
    }

    /// Upward force proportional to submersion depth below the fluid level.
    pub fn apply_buoyancy(&self, body: &mut RigidBody) {
        let Some(level) = self.config.fluid_level else {
            return;
        };
        if body.is_static() {
            return;
        }
        let depth = level - body.position().z;
        if depth > 0.0 {
            let lift = depth * body.mass() * self.config.buoyancy_coefficient;
            body.add_environment_force(Vec3::Z * lift);
        }
    }

    /// Naive O(n²) contact pass. Each member of a touching pair inverts its
    /// own vertical velocity scaled by its own restitution. Static bodies act
    /// as obstacles and are never modified.
    pub fn resolve_collisions(&self, bodies: &mut [&mut RigidBody]) {
        let radius = self.config.contact_radius;
        for i in 0..bodies.len() {
            let (head, tail) = bodies.split_at_mut(i + 1);
            let a = &mut head[i];
            for b in tail.iter_mut() {
                if a.position().distance(b.position()) < radius {
                    a.bounce_vertical();
                    b.bounce_vertical();
                }
            }
        }
    }
}
