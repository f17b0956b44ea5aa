use glam::Vec3;
use rapier3d::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use twinsim_common::BodyId;
use twinsim_kernel::{BodyFault, PhysicsBackend, RigidBody, StepReport, World};

use crate::config::NativeConfig;
use crate::error::BackendError;

/// Kernel bodies mirrored into a rapier3d world.
///
/// `PhysicsPipeline::step()` needs every set mutably at once, so they all
/// live together here.
pub struct NativeBackend {
    config: NativeConfig,
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    handles: BTreeMap<BodyId, RigidBodyHandle>,
}

impl std::fmt::Debug for NativeBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeBackend")
            .field("config", &self.config)
            .field("bodies", &self.handles.len())
            .finish_non_exhaustive()
    }
}

impl NativeBackend {
    /// Build the native world on the blocking pool, bounded by
    /// `init_timeout_ms`. Requires a tokio runtime.
    pub async fn initialize(config: NativeConfig) -> Result<Self, BackendError> {
        tokio::runtime::Handle::try_current().map_err(|_| BackendError::NoRuntime)?;
        let limit = Duration::from_millis(config.init_timeout_ms);
        let build = tokio::task::spawn_blocking(move || Self::build(config));
        match tokio::time::timeout(limit, build).await {
            Err(_) => Err(BackendError::Timeout(limit)),
            Ok(Err(join)) => Err(BackendError::Aborted(join.to_string())),
            Ok(Ok(result)) => result,
        }
    }

    /// Construct the world synchronously: pipeline, solver sets, gravity and
    /// a static ground half-space at z = 0.
    pub fn build(config: NativeConfig) -> Result<Self, BackendError> {
        config.validate()?;
        let [gx, gy, gz] = config.gravity;

        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = config.substep_dt;

        let mut collider_set = ColliderSet::new();
        collider_set.insert(ColliderBuilder::halfspace(Vector::z_axis()).build());

        tracing::debug!(?config, "native world constructed");
        Ok(Self {
            config,
            gravity: vector![gx, gy, gz],
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set,
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            handles: BTreeMap::new(),
        })
    }

    pub fn config(&self) -> &NativeConfig {
        &self.config
    }

    pub fn body_count(&self) -> usize {
        self.handles.len()
    }

    pub fn contains(&self, id: &BodyId) -> bool {
        self.handles.contains_key(id)
    }

    /// Engine-side translation of a mirrored body.
    pub fn native_position(&self, id: &BodyId) -> Option<Vec3> {
        let handle = self.handles.get(id)?;
        self.rigid_body_set
            .get(*handle)
            .map(|rb| from_vector(rb.translation()))
    }

    /// Teleport an existing native body to the app's current state, or mirror
    /// it if it has no counterpart yet.
    pub fn resync_body(&mut self, body: &RigidBody) {
        let Some(&handle) = self.handles.get(body.id()) else {
            self.create_body(body);
            return;
        };
        if let Some(rb) = self.rigid_body_set.get_mut(handle) {
            rb.set_translation(to_vector(body.position()), true);
            rb.set_linvel(to_vector(body.velocity()), true);
            if !rb.angvel().iter().all(|c| c.is_finite()) {
                rb.set_angvel(Vector::zeros(), true);
            }
            tracing::trace!(id = %body.id(), "native body resynchronized");
        }
    }

    fn step_engine(&mut self, dt: f32) {
        let substeps = self.config.substeps_for(dt);
        self.integration_parameters.dt = dt / substeps as f32;
        for _ in 0..substeps {
            self.physics_pipeline.step(
                &self.gravity,
                &self.integration_parameters,
                &mut self.island_manager,
                &mut self.broad_phase,
                &mut self.narrow_phase,
                &mut self.rigid_body_set,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                &mut self.ccd_solver,
                None,
                &(),
                &(),
            );
        }
        for handle in self.handles.values() {
            if let Some(rb) = self.rigid_body_set.get_mut(*handle) {
                rb.reset_forces(false);
                rb.reset_torques(false);
            }
        }
    }
}

impl PhysicsBackend for NativeBackend {
    fn name(&self) -> &'static str {
        "rapier3d"
    }

    fn create_body(&mut self, body: &RigidBody) {
        if self.handles.contains_key(body.id()) {
            return;
        }
        let fixed = body.is_static() || body.mass() <= 0.0;
        let builder = if fixed {
            RigidBodyBuilder::fixed()
        } else {
            RigidBodyBuilder::dynamic()
        };
        let rb = builder
            .translation(to_vector(body.position()))
            .linvel(to_vector(body.velocity()))
            .linear_damping(body.drag())
            .angular_damping(body.drag())
            .gravity_scale(if body.uses_gravity() { 1.0 } else { 0.0 })
            .can_sleep(false)
            .build();
        let handle = self.rigid_body_set.insert(rb);

        let [hx, hy, hz] = self.config.half_extents;
        let mut collider = ColliderBuilder::cuboid(hx, hy, hz)
            .restitution(body.restitution())
            .friction(body.friction());
        if !fixed {
            collider = collider.mass(body.mass());
        }
        self.collider_set
            .insert_with_parent(collider.build(), handle, &mut self.rigid_body_set);

        self.handles.insert(body.id().clone(), handle);
        tracing::debug!(id = %body.id(), fixed, "native body created");
    }

    fn remove_body(&mut self, id: &BodyId) {
        let Some(handle) = self.handles.remove(id) else {
            return;
        };
        let removed = self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        if removed.is_none() {
            tracing::debug!(%id, "stale native handle on release, ignored");
        }
    }

    fn step(&mut self, world: &mut World, dt: f32) -> StepReport {
        let _span = tracing::trace_span!("native_step", tick = world.tick()).entered();
        let mut faults = Vec::new();
        let mut skipped = BTreeSet::new();

        for body in world.iter_mut() {
            let motor = body.drive_motor(dt, &self.config.motor);
            let (force, torque) = body.take_accumulators();
            if body.is_static() {
                continue;
            }
            let Some(&handle) = self.handles.get(body.id()) else {
                tracing::debug!(id = %body.id(), "body has no native counterpart");
                continue;
            };
            let load = force + motor;
            if !(load.is_finite() && torque.is_finite()) {
                let fault = BodyFault::NonFinite(body.id().clone());
                tracing::warn!(%fault, "non-finite load dropped, body skipped this tick");
                faults.push(fault);
                skipped.insert(body.id().clone());
                continue;
            }
            if let Some(rb) = self.rigid_body_set.get_mut(handle) {
                rb.add_force(to_vector(load), true);
                rb.add_torque(to_vector(torque), true);
            }
        }

        if dt.is_finite() && dt > 0.0 {
            self.step_engine(dt);
        }

        for body in world.iter_mut() {
            if body.is_static() {
                continue;
            }
            // Skipped bodies keep their pre-step state on both sides.
            if skipped.contains(body.id()) {
                self.resync_body(body);
                continue;
            }
            let Some(rb) = self
                .handles
                .get(body.id())
                .and_then(|h| self.rigid_body_set.get(*h))
            else {
                continue;
            };
            let position = from_vector(rb.translation());
            let velocity = from_vector(rb.linvel());
            if !(position.is_finite() && velocity.is_finite()) {
                let fault = BodyFault::NonFinite(body.id().clone());
                tracing::warn!(%fault, "native body not synced this tick");
                faults.push(fault);
                self.resync_body(body);
                continue;
            }
            body.sync_from_backend(position, velocity);
        }

        world.advance_tick();
        StepReport { faults }
    }
}

fn to_vector(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

fn from_vector(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}
