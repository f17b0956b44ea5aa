use glam::{BVec3, Vec3};
use serde::{Deserialize, Serialize};
use twinsim_common::BodyId;

use crate::error::BodyError;

/// Blend factor applied when a snapshot arrives for a body whose own
/// reconciliation alpha is unset.
pub const SNAPSHOT_ALPHA: f32 = 0.15;

/// Step used by the motor when a caller passes a non-positive dt.
const FALLBACK_DT: f32 = 1.0 / 60.0;

/// Construction options accepted from the host when a body is attached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyOptions {
    pub mass: f32,
    /// Fraction of velocity removed every step, in [0, 1).
    pub drag: f32,
    pub restitution: f32,
    pub friction: f32,
    pub use_gravity: bool,
    pub is_static: bool,
    /// Per-step blend toward a staged server position. Zero means unset.
    pub reconciliation_alpha: f32,
}

impl Default for BodyOptions {
    fn default() -> Self {
        Self {
            mass: 1.0,
            drag: 0.02,
            restitution: 0.3,
            friction: 0.5,
            use_gravity: true,
            is_static: false,
            reconciliation_alpha: 0.1,
        }
    }
}

impl BodyOptions {
    fn validate(&self, id: &BodyId) -> Result<(), BodyError> {
        if !self.is_static && !(self.mass.is_finite() && self.mass > 0.0) {
            return Err(BodyError::InvalidMass {
                id: id.clone(),
                mass: self.mass,
            });
        }
        if !(0.0..1.0).contains(&self.drag) {
            return Err(BodyError::InvalidDrag {
                id: id.clone(),
                drag: self.drag,
            });
        }
        for (field, value) in [
            ("restitution", self.restitution),
            ("friction", self.friction),
            ("reconciliation_alpha", self.reconciliation_alpha),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(BodyError::OutOfUnitRange {
                    id: id.clone(),
                    field,
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Proportional gain of the velocity motor.
///
/// The effective gain is `min(cap, gain * mass)`, and the motor force on each
/// axis is bounded by `effective_gain * mass`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorGains {
    pub gain: f32,
    pub cap: f32,
}

impl Default for MotorGains {
    fn default() -> Self {
        Self {
            gain: 50.0,
            cap: 200.0,
        }
    }
}

impl MotorGains {
    /// Effective gain for a body of `mass`.
    pub fn proportional(&self, mass: f32) -> f32 {
        (self.gain * mass).min(self.cap)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

/// The unit of simulation.
///
/// Position is owned here; renderers read it and never write it. Callers steer
/// a body through its target velocity and force/torque accumulators. Actual
/// velocity is read-only from the outside, except for [`RigidBody::hard_stop`].
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBody {
    id: BodyId,
    options: BodyOptions,
    position: Vec3,
    velocity: Vec3,
    target_velocity: Vec3,
    /// Axes on which the motor is driving toward the target.
    motor_axes: BVec3,
    force: Vec3,
    torque: Vec3,
    last_applied_force: Vec3,
    last_applied_torque: Vec3,
    last_motor_force: Vec3,
    server_position: Option<Vec3>,
    server_velocity: Option<Vec3>,
    reconciliation_alpha: f32,
}

impl RigidBody {
    pub fn new(id: BodyId, position: Vec3, options: BodyOptions) -> Result<Self, BodyError> {
        options.validate(&id)?;
        Ok(Self {
            id,
            reconciliation_alpha: options.reconciliation_alpha,
            options,
            position,
            velocity: Vec3::ZERO,
            target_velocity: Vec3::ZERO,
            motor_axes: BVec3::FALSE,
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
            last_applied_force: Vec3::ZERO,
            last_applied_torque: Vec3::ZERO,
            last_motor_force: Vec3::ZERO,
            server_position: None,
            server_velocity: None,
        })
    }

    /// Host-assigned identifier.
    pub fn id(&self) -> &BodyId {
        &self.id
    }

    /// Options the body was created with.
    pub fn options(&self) -> &BodyOptions {
        &self.options
    }

    /// World position in metres, Z up.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Actual velocity as of the last step.
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Velocity the motor drives toward on engaged axes.
    pub fn target_velocity(&self) -> Vec3 {
        self.target_velocity
    }

    /// Axes with an engaged motor target.
    pub fn motor_axes(&self) -> BVec3 {
        self.motor_axes
    }

    /// Mass in kilograms.
    pub fn mass(&self) -> f32 {
        self.options.mass
    }

    pub fn drag(&self) -> f32 {
        self.options.drag
    }

    /// Vertical bounce factor.
    pub fn restitution(&self) -> f32 {
        self.options.restitution
    }

    pub fn friction(&self) -> f32 {
        self.options.friction
    }

    /// Whether gravity acts on this body.
    pub fn uses_gravity(&self) -> bool {
        self.options.use_gravity
    }

    pub fn is_static(&self) -> bool {
        self.options.is_static
    }

    /// Pending force for the current step.
    pub fn force(&self) -> Vec3 {
        self.force
    }

    /// Pending torque for the current step.
    pub fn torque(&self) -> Vec3 {
        self.torque
    }

    /// Most recent single force contribution.
    pub fn last_applied_force(&self) -> Vec3 {
        self.last_applied_force
    }

    pub fn last_applied_torque(&self) -> Vec3 {
        self.last_applied_torque
    }

    /// Motor force computed in the last step.
    pub fn last_motor_force(&self) -> Vec3 {
        self.last_motor_force
    }

    /// Staged authoritative position, if any.
    pub fn server_position(&self) -> Option<Vec3> {
        self.server_position
    }

    pub fn server_velocity(&self) -> Option<Vec3> {
        self.server_velocity
    }

    /// Per-step blend toward staged server state.
    pub fn reconciliation_alpha(&self) -> f32 {
        self.reconciliation_alpha
    }

    /// Add a force (N) for the current step. Contributions compose additively.
    pub fn apply_force(&mut self, force: Vec3) {
        self.force += force;
        self.last_applied_force = force;
        tracing::trace!(body = %self.id, ?force, "force applied");
    }

    /// Add a torque (N·m) for the current step.
    pub fn apply_torque(&mut self, torque: Vec3) {
        self.torque += torque;
        self.last_applied_torque = torque;
        tracing::trace!(body = %self.id, ?torque, "torque applied");
    }

    /// Desired velocity on all three axes; engages the motor everywhere.
    pub fn set_target_velocity(&mut self, target: Vec3) {
        self.target_velocity = target;
        self.motor_axes = BVec3::TRUE;
    }

    /// Desired velocity on a single axis; other axes keep their state.
    pub fn set_target_axis(&mut self, axis: Axis, value: f32) {
        let i = axis.index();
        self.target_velocity[i] = value;
        let mut axes: [bool; 3] = self.motor_axes.into();
        axes[i] = true;
        self.motor_axes = BVec3::from(axes);
    }

    /// Stop driving toward any target. The body coasts under drag and forces.
    pub fn release_motor(&mut self) {
        self.motor_axes = BVec3::FALSE;
    }

    /// Brake/arrival escape hatch: zero every velocity field at once.
    pub fn hard_stop(&mut self) {
        self.velocity = Vec3::ZERO;
        self.target_velocity = Vec3::ZERO;
        self.motor_axes = BVec3::FALSE;
        self.force = Vec3::ZERO;
        self.torque = Vec3::ZERO;
        if self.server_velocity.is_some() {
            self.server_velocity = Some(Vec3::ZERO);
        }
    }

    /// Stage authoritative state. Blending happens inside the next step.
    pub fn stage_server_state(&mut self, position: Vec3, velocity: Vec3) {
        self.server_position = Some(position);
        self.server_velocity = Some(velocity);
        if self.reconciliation_alpha <= 0.0 {
            self.reconciliation_alpha = SNAPSHOT_ALPHA;
        }
    }

    /// Drop any staged authoritative state.
    pub fn clear_server_state(&mut self) {
        self.server_position = None;
        self.server_velocity = None;
    }

    /// Bounded force that drives actual velocity toward the target on every
    /// engaged axis. Disengaged axes contribute nothing.
    pub fn motor_force(&self, dt: f32, gains: &MotorGains) -> Vec3 {
        if self.is_static() || !self.motor_axes.any() {
            return Vec3::ZERO;
        }
        let dt = if dt > 0.0 { dt } else { FALLBACK_DT };
        let mass = self.mass();
        let bound = Vec3::splat(gains.proportional(mass) * mass);
        let desired = (self.target_velocity - self.velocity) * mass / dt;
        Vec3::select(self.motor_axes, desired.clamp(-bound, bound), Vec3::ZERO)
    }

    /// Compute the motor force for this step and remember it for diagnostics.
    pub fn drive_motor(&mut self, dt: f32, gains: &MotorGains) -> Vec3 {
        let motor = self.motor_force(dt, gains);
        self.last_motor_force = motor;
        motor
    }

    /// Consume the accumulated force and torque, leaving both at zero.
    pub fn take_accumulators(&mut self) -> (Vec3, Vec3) {
        (
            std::mem::take(&mut self.force),
            std::mem::take(&mut self.torque),
        )
    }

    /// Overwrite kinematics with the truth of an external dynamics engine.
    /// Only backends call this, once per step.
    pub fn sync_from_backend(&mut self, position: Vec3, velocity: Vec3) {
        self.position = position;
        self.velocity = velocity;
    }

    pub(crate) fn set_kinematics(&mut self, position: Vec3, velocity: Vec3) {
        self.position = position;
        self.velocity = velocity;
    }

    /// Environmental contribution (buoyancy); not reported as a caller force.
    pub(crate) fn add_environment_force(&mut self, force: Vec3) {
        self.force += force;
    }

    /// Invert vertical velocity scaled by this body's own restitution.
    pub(crate) fn bounce_vertical(&mut self) {
        if self.is_static() {
            return;
        }
        self.velocity.z *= -self.options.restitution;
    }

    /// Keep the body above z = 0 and kill micro-bounces.
    pub(crate) fn settle_on_ground(&mut self, rest_threshold: f32) {
        if self.is_static() || self.position.z >= 0.0 {
            return;
        }
        self.position.z = 0.0;
        self.velocity.z *= -self.options.restitution;
        if self.velocity.z.abs() < rest_threshold {
            self.velocity.z = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(options: BodyOptions) -> RigidBody {
        RigidBody::new("b".into(), Vec3::ZERO, options).unwrap()
    }

    #[test]
    fn defaults_match_host_contract() {
        let o = BodyOptions::default();
        assert_eq!(o.mass, 1.0);
        assert_eq!(o.drag, 0.02);
        assert_eq!(o.restitution, 0.3);
        assert_eq!(o.friction, 0.5);
        assert!(o.use_gravity);
        assert!(!o.is_static);
    }

    #[test]
    fn rejects_non_positive_mass_for_dynamic_body() {
        let err = RigidBody::new(
            "heavy".into(),
            Vec3::ZERO,
            BodyOptions {
                mass: 0.0,
                ..BodyOptions::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, BodyError::InvalidMass { .. }));
    }

    #[test]
    fn static_body_may_be_massless() {
        let b = RigidBody::new(
            "wall".into(),
            Vec3::ZERO,
            BodyOptions {
                mass: 0.0,
                is_static: true,
                ..BodyOptions::default()
            },
        );
        assert!(b.is_ok());
    }

    #[test]
    fn rejects_drag_of_one() {
        let err = RigidBody::new(
            "b".into(),
            Vec3::ZERO,
            BodyOptions {
                drag: 1.0,
                ..BodyOptions::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, BodyError::InvalidDrag { .. }));
    }

    #[test]
    fn rejects_restitution_above_one() {
        let err = RigidBody::new(
            "b".into(),
            Vec3::ZERO,
            BodyOptions {
                restitution: 1.5,
                ..BodyOptions::default()
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            BodyError::OutOfUnitRange {
                field: "restitution",
                ..
            }
        ));
    }

    #[test]
    fn forces_accumulate_and_are_consumed_once() {
        let mut b = body(BodyOptions::default());
        b.apply_force(Vec3::new(1.0, 0.0, 0.0));
        b.apply_force(Vec3::new(2.0, 3.0, 0.0));
        b.apply_torque(Vec3::Z);
        assert_eq!(b.force(), Vec3::new(3.0, 3.0, 0.0));
        assert_eq!(b.last_applied_force(), Vec3::new(2.0, 3.0, 0.0));

        let (force, torque) = b.take_accumulators();
        assert_eq!(force, Vec3::new(3.0, 3.0, 0.0));
        assert_eq!(torque, Vec3::Z);
        assert_eq!(b.force(), Vec3::ZERO);
        assert_eq!(b.torque(), Vec3::ZERO);
    }

    #[test]
    fn target_velocity_does_not_touch_actual_velocity() {
        let mut b = body(BodyOptions::default());
        b.set_target_velocity(Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(b.velocity(), Vec3::ZERO);
        assert_eq!(b.target_velocity(), Vec3::new(0.0, 5.0, 0.0));
        assert!(b.motor_axes().all());
    }

    #[test]
    fn motor_is_silent_until_engaged() {
        let b = body(BodyOptions::default());
        assert_eq!(b.motor_force(1.0 / 60.0, &MotorGains::default()), Vec3::ZERO);
    }

    #[test]
    fn single_axis_target_only_drives_that_axis() {
        let mut b = body(BodyOptions::default());
        b.set_target_axis(Axis::Y, 1.0);
        let motor = b.motor_force(1.0 / 60.0, &MotorGains::default());
        assert_eq!(motor.x, 0.0);
        assert!(motor.y > 0.0);
        assert_eq!(motor.z, 0.0);
    }

    #[test]
    fn motor_force_is_bounded_by_gain_times_mass() {
        let mut b = body(BodyOptions {
            mass: 1200.0,
            ..BodyOptions::default()
        });
        b.set_target_velocity(Vec3::new(0.0, 5.0, 0.0));
        let gains = MotorGains::default();
        let motor = b.motor_force(1.0 / 60.0, &gains);
        // Unbounded would be 1200 * 5 * 60 = 360_000 N; cap is 200 * 1200.
        assert_eq!(motor.y, 200.0 * 1200.0);
    }

    #[test]
    fn hard_stop_zeroes_all_velocity_fields() {
        let mut b = body(BodyOptions::default());
        b.set_kinematics(Vec3::ZERO, Vec3::new(3.0, 2.0, 1.0));
        b.set_target_velocity(Vec3::ONE);
        b.stage_server_state(Vec3::ONE, Vec3::ONE);
        b.apply_force(Vec3::X);

        b.hard_stop();
        assert_eq!(b.velocity(), Vec3::ZERO);
        assert_eq!(b.target_velocity(), Vec3::ZERO);
        assert!(!b.motor_axes().any());
        assert_eq!(b.server_velocity(), Some(Vec3::ZERO));
        assert_eq!(b.force(), Vec3::ZERO);
    }

    #[test]
    fn staging_server_state_sets_missing_alpha() {
        let mut b = body(BodyOptions {
            reconciliation_alpha: 0.0,
            ..BodyOptions::default()
        });
        b.stage_server_state(Vec3::ONE, Vec3::ZERO);
        assert_eq!(b.reconciliation_alpha(), SNAPSHOT_ALPHA);
        assert_eq!(b.server_position(), Some(Vec3::ONE));
    }

    #[test]
    fn staging_server_state_keeps_configured_alpha() {
        let mut b = body(BodyOptions::default());
        b.stage_server_state(Vec3::ONE, Vec3::ZERO);
        assert_eq!(b.reconciliation_alpha(), 0.1);
    }

    #[test]
    fn ground_settle_kills_micro_bounce() {
        let mut b = body(BodyOptions::default());
        b.set_kinematics(Vec3::new(0.0, 0.0, -0.01), Vec3::new(0.0, 0.0, -0.2));
        b.settle_on_ground(0.1);
        assert_eq!(b.position().z, 0.0);
        // 0.2 * 0.3 = 0.06 < threshold
        assert_eq!(b.velocity().z, 0.0);
    }

    #[test]
    fn ground_settle_bounces_with_restitution() {
        let mut b = body(BodyOptions::default());
        b.set_kinematics(Vec3::new(0.0, 0.0, -0.5), Vec3::new(0.0, 0.0, -4.0));
        b.settle_on_ground(0.1);
        assert_eq!(b.position().z, 0.0);
        assert!((b.velocity().z - 1.2).abs() < 1e-6);
    }
}
