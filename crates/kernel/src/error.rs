use twinsim_common::BodyId;

/// Rejected body construction parameters.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BodyError {
    #[error("body {id}: mass must be finite and positive for a dynamic body, got {mass}")]
    InvalidMass { id: BodyId, mass: f32 },
    #[error("body {id}: drag must lie in [0, 1), got {drag}")]
    InvalidDrag { id: BodyId, drag: f32 },
    #[error("body {id}: {field} must lie in [0, 1], got {value}")]
    OutOfUnitRange {
        id: BodyId,
        field: &'static str,
        value: f32,
    },
}

/// A single body's update failed during a step. The step continues for every
/// other body; the faulted body keeps its pre-step kinematics for that tick.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BodyFault {
    #[error("body {0} produced non-finite kinematics")]
    NonFinite(BodyId),
}
