//! Simulation kernel: rigid bodies, the analytic integrator, and the body
//! registry every backend steps over.
//!
//! # Invariants
//! - Force and torque accumulators are consumed exactly once per step.
//! - Actual velocity only changes inside a step, on backend write-back, or
//!   through an explicit hard stop. Callers express intent via target velocity.
//! - Body iteration order is deterministic (BTreeMap keyed by id).
//! - Z is up; the ground plane is z = 0.

pub mod backend;
pub mod body;
pub mod error;
pub mod integrator;
pub mod world;

pub use backend::{AnalyticBackend, PhysicsBackend, StepReport};
pub use body::{Axis, BodyOptions, MotorGains, RigidBody};
pub use error::{BodyError, BodyFault};
pub use integrator::{Integrator, IntegratorConfig};
pub use world::{PositionSink, World};
