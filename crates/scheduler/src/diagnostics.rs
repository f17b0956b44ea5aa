use std::fmt;
use std::time::Duration;
use twinsim_router::{Mode, Router};

/// Advisory per-window tick summary, shaped for a debug overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct TickDiagnostics {
    pub mode: Mode,
    /// Steps run during the last window.
    pub ticks: u64,
    pub total_ticks: u64,
    pub bodies: usize,
    /// Lead body's motor force on Y.
    pub engine: f32,
    /// Lead body's last applied force on Y.
    pub brake: f32,
    /// Lead body's last applied torque on Z.
    pub steer: f32,
    pub average_frame: Duration,
}

impl TickDiagnostics {
    /// Sample the router. The lead body is the first in id order.
    pub fn capture(router: &Router, ticks: u64, total_ticks: u64, average_frame: Duration) -> Self {
        let (engine, brake, steer) = router
            .bodies()
            .next()
            .map(|b| {
                (
                    b.last_motor_force().y,
                    b.last_applied_force().y,
                    b.last_applied_torque().z,
                )
            })
            .unwrap_or_default();
        Self {
            mode: router.mode(),
            ticks,
            total_ticks,
            bodies: router.world().len(),
            engine,
            brake,
            steer,
            average_frame,
        }
    }
}

impl fmt::Display for TickDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Mode: {} | Ticks: {} | engine:{:.2} brake:{:.2} steer:{:.2}",
            self.mode, self.ticks, self.engine, self.brake, self.steer
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use twinsim_kernel::BodyOptions;
    use twinsim_router::RouterConfig;

    #[test]
    fn overlay_line_reports_lead_body() {
        let mut router = Router::new(RouterConfig::default());
        router
            .register_body("lead", Vec3::ZERO, BodyOptions::default())
            .unwrap();
        router.apply_force(&"lead".into(), Vec3::new(0.0, -150.0, 0.0));
        router.apply_torque(&"lead".into(), Vec3::new(0.0, 0.0, 20.0));

        let diag = TickDiagnostics::capture(&router, 30, 30, Duration::from_millis(16));
        assert_eq!(
            diag.to_string(),
            "Mode: Light | Ticks: 30 | engine:0.00 brake:-150.00 steer:20.00"
        );
        assert_eq!(diag.bodies, 1);
    }

    #[test]
    fn empty_world_reports_zeros() {
        let router = Router::new(RouterConfig::default());
        let diag = TickDiagnostics::capture(&router, 0, 0, Duration::ZERO);
        assert_eq!(
            diag.to_string(),
            "Mode: Light | Ticks: 0 | engine:0.00 brake:0.00 steer:0.00"
        );
    }
}
