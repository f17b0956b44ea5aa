use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use twinsim_common::{BodyId, InputEvent};
use twinsim_router::Router;

use crate::action::Action;

/// Per-unit-mass gains for keyboard driving.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Engine force per kilogram, N/kg.
    pub engine_gain: f32,
    /// Steering torque per kilogram.
    pub steer_gain: f32,
    /// Jump force per kilogram, N/kg.
    pub jump_gain: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            engine_gain: 150.0,
            steer_gain: 20.0,
            jump_gain: 6.0,
        }
    }
}

/// Drives one body from key presses.
#[derive(Debug, Clone)]
pub struct KeyboardController {
    body: BodyId,
    config: ControllerConfig,
}

impl KeyboardController {
    pub fn new(body: impl Into<BodyId>, config: ControllerConfig) -> Self {
        Self {
            body: body.into(),
            config,
        }
    }

    pub fn body(&self) -> &BodyId {
        &self.body
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Apply a key press now. See [`KeyboardController::press_at`].
    pub fn press(&self, key: &str, router: &mut Router) -> Option<InputEvent> {
        self.press_at(key, router, now_millis())
    }

    /// Apply a key press stamped `ts` (ms since the epoch). Returns the input
    /// event to forward upstream, or `None` for unbound keys and unknown
    /// bodies.
    pub fn press_at(&self, key: &str, router: &mut Router, ts: u64) -> Option<InputEvent> {
        let action = Action::from_key(key);
        if action.is_noop() || !self.apply(action, router) {
            return None;
        }
        Some(InputEvent {
            id: self.body.clone(),
            key: key.to_owned(),
            ts,
        })
    }

    /// Translate an action into router calls on the controlled body. Returns
    /// false if the body is not registered.
    pub fn apply(&self, action: Action, router: &mut Router) -> bool {
        let Some(mass) = router.body(&self.body).map(|b| b.mass()) else {
            tracing::debug!(body = %self.body, "controlled body not registered");
            return false;
        };
        let id = &self.body;
        match action {
            Action::Throttle(dir) => {
                router.apply_force(id, Vec3::new(0.0, dir * self.config.engine_gain * mass, 0.0))
            }
            Action::Steer(dir) => {
                router.apply_torque(id, Vec3::new(0.0, 0.0, dir * self.config.steer_gain * mass))
            }
            Action::Jump => {
                router.apply_force(id, Vec3::new(0.0, 0.0, self.config.jump_gain * mass))
            }
            Action::Brake => router.hard_stop(id),
            Action::Cruise(target) => router.set_target_velocity(id, target),
            Action::Noop => true,
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use twinsim_kernel::BodyOptions;
    use twinsim_router::RouterConfig;

    fn setup(mass: f32) -> (Router, KeyboardController) {
        let mut router = Router::new(RouterConfig::default());
        router
            .register_body(
                "car",
                Vec3::ZERO,
                BodyOptions {
                    mass,
                    use_gravity: false,
                    ..BodyOptions::default()
                },
            )
            .unwrap();
        (router, KeyboardController::new("car", ControllerConfig::default()))
    }

    #[test]
    fn throttle_scales_with_mass() {
        let (mut router, pad) = setup(2.0);
        pad.press_at("w", &mut router, 0).unwrap();
        let car = router.body(&"car".into()).unwrap();
        assert_eq!(car.force(), Vec3::new(0.0, 300.0, 0.0));

        pad.press_at("s", &mut router, 0).unwrap();
        assert_eq!(router.body(&"car".into()).unwrap().force(), Vec3::ZERO);
    }

    #[test]
    fn steering_and_jump() {
        let (mut router, pad) = setup(1.0);
        pad.press_at("d", &mut router, 0).unwrap();
        pad.press_at(" ", &mut router, 0).unwrap();
        let car = router.body(&"car".into()).unwrap();
        assert_eq!(car.torque(), Vec3::new(0.0, 0.0, -20.0));
        assert_eq!(car.force(), Vec3::new(0.0, 0.0, 6.0));
    }

    #[test]
    fn press_yields_forwardable_event() {
        let (mut router, pad) = setup(1.0);
        let event = pad.press_at("w", &mut router, 1234).unwrap();
        assert_eq!(event.id, BodyId::from("car"));
        assert_eq!(event.key, "w");
        assert_eq!(event.ts, 1234);
    }

    #[test]
    fn unbound_key_does_nothing() {
        let (mut router, pad) = setup(1.0);
        assert!(pad.press_at("q", &mut router, 0).is_none());
        assert_eq!(router.body(&"car".into()).unwrap().force(), Vec3::ZERO);
    }

    #[test]
    fn brake_stops_the_body() {
        let (mut router, pad) = setup(1.0);
        pad.apply(Action::Cruise(Vec3::new(0.0, 4.0, 0.0)), &mut router);
        for _ in 0..30 {
            router.step(1.0 / 60.0);
        }
        assert!(router.body(&"car".into()).unwrap().velocity().y > 0.0);

        pad.press_at("x", &mut router, 0).unwrap();
        let car = router.body(&"car".into()).unwrap();
        assert_eq!(car.velocity(), Vec3::ZERO);
        assert_eq!(car.target_velocity(), Vec3::ZERO);
    }

    #[test]
    fn unknown_body_is_reported() {
        let mut router = Router::new(RouterConfig::default());
        let pad = KeyboardController::new("ghost", ControllerConfig::default());
        assert!(pad.press_at("w", &mut router, 0).is_none());
        assert!(!pad.apply(Action::Brake, &mut router));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: ControllerConfig = serde_yaml::from_str("engine_gain: 90\n").unwrap();
        assert_eq!(config.engine_gain, 90.0);
        assert_eq!(config.steer_gain, 20.0);
        assert_eq!(config.jump_gain, 6.0);
    }
}
