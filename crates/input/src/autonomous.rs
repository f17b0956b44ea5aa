use glam::{Vec2, Vec3Swizzles};
use serde::{Deserialize, Serialize};
use twinsim_common::BodyId;
use twinsim_kernel::Axis;
use twinsim_router::Router;

/// Cruise parameters for route following.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutopilotConfig {
    /// Planar cruise speed, m/s.
    pub max_speed: f32,
    /// A waypoint counts as reached inside this planar distance, m.
    pub arrival_radius: f32,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            max_speed: 5.0,
            arrival_radius: 1.0,
        }
    }
}

/// Outcome of one [`AutonomousController::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteStatus {
    /// No active route, or the body is not registered.
    Idle,
    /// Heading for the waypoint at this index.
    Driving(usize),
    /// The final waypoint was reached this update and the body hard-stopped.
    Arrived,
}

/// Follows a planar route by steering the body's X/Y target velocity.
///
/// Vertical motion is left to gravity and the ground. Arrival at the last
/// waypoint is a hard stop.
#[derive(Debug, Clone)]
pub struct AutonomousController {
    body: BodyId,
    config: AutopilotConfig,
    route: Vec<Vec2>,
    current: usize,
    active: bool,
}

impl AutonomousController {
    pub fn new(body: impl Into<BodyId>, config: AutopilotConfig) -> Self {
        Self {
            body: body.into(),
            config,
            route: Vec::new(),
            current: 0,
            active: false,
        }
    }

    pub fn body(&self) -> &BodyId {
        &self.body
    }

    /// Whether a route is being followed.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Index of the waypoint being approached.
    pub fn current_waypoint(&self) -> usize {
        self.current
    }

    /// Replace the route and start from its first point. An empty route
    /// leaves the controller idle.
    pub fn set_route(&mut self, points: impl IntoIterator<Item = Vec2>) {
        self.route = points.into_iter().collect();
        self.current = 0;
        self.active = !self.route.is_empty();
        tracing::debug!(body = %self.body, waypoints = self.route.len(), "route set");
    }

    /// Abandon the route and hard-stop the body.
    pub fn stop(&mut self, router: &mut Router) -> bool {
        self.active = false;
        router.hard_stop(&self.body)
    }

    /// Steer toward the current waypoint. Call once per frame, before the
    /// router steps.
    pub fn update(&mut self, router: &mut Router) -> RouteStatus {
        if !self.active {
            return RouteStatus::Idle;
        }
        let Some(position) = router.body(&self.body).map(|b| b.position().xy()) else {
            tracing::debug!(body = %self.body, "routed body not registered");
            return RouteStatus::Idle;
        };
        let Some(&target) = self.route.get(self.current) else {
            self.active = false;
            return RouteStatus::Idle;
        };

        let offset = target - position;
        if offset.length() < self.config.arrival_radius {
            self.current += 1;
            if self.current >= self.route.len() {
                self.stop(router);
                tracing::info!(body = %self.body, "route complete");
                return RouteStatus::Arrived;
            }
            return RouteStatus::Driving(self.current);
        }

        let heading = offset.normalize_or_zero() * self.config.max_speed;
        router.set_target_axis(&self.body, Axis::X, heading.x);
        router.set_target_axis(&self.body, Axis::Y, heading.y);
        RouteStatus::Driving(self.current)
    }
}
