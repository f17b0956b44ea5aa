use serde::{Deserialize, Serialize};
use twinsim_kernel::MotorGains;

use crate::error::BackendError;

/// Native world parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeConfig {
    pub gravity: [f32; 3],
    /// Upper bound on engine substeps per router step.
    pub max_substeps: usize,
    pub substep_dt: f32,
    /// Every body is mirrored as a box of these half extents.
    pub half_extents: [f32; 3],
    pub init_timeout_ms: u64,
    pub motor: MotorGains,
}

impl Default for NativeConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, 0.0, -9.81],
            max_substeps: 5,
            substep_dt: 1.0 / 60.0,
            half_extents: [1.0, 1.0, 1.0],
            init_timeout_ms: 5000,
            motor: MotorGains::default(),
        }
    }
}

impl NativeConfig {
    pub(crate) fn validate(&self) -> Result<(), BackendError> {
        if self.max_substeps == 0 {
            return Err(BackendError::Construction(
                "max_substeps must be at least 1".into(),
            ));
        }
        if !(self.substep_dt.is_finite() && self.substep_dt > 0.0) {
            return Err(BackendError::Construction(format!(
                "substep_dt must be positive, got {}",
                self.substep_dt
            )));
        }
        if !self.half_extents.iter().all(|e| e.is_finite() && *e > 0.0) {
            return Err(BackendError::Construction(format!(
                "half extents must be positive, got {:?}",
                self.half_extents
            )));
        }
        if !self.gravity.iter().all(|g| g.is_finite()) {
            return Err(BackendError::Construction("gravity must be finite".into()));
        }
        Ok(())
    }

    /// Engine substeps needed to cover `dt`, tolerating float rounding
    /// (two 60 Hz substeps for a 30 Hz step, not three).
    pub fn substeps_for(&self, dt: f32) -> usize {
        let ratio = dt / self.substep_dt - 1e-3;
        (ratio.ceil().max(1.0) as usize).min(self.max_substeps)
    }
}
