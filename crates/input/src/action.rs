use glam::Vec3;

/// A high-level intent produced by any controller.
///
/// The router consumes actions, never raw key codes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Engine force along Y: +1 forward, -1 reverse.
    Throttle(f32),
    /// Steering torque about Z: +1 left, -1 right.
    Steer(f32),
    /// Upward impulse-like force on Z.
    Jump,
    /// Zero every velocity field of the body.
    Brake,
    /// Hold a target velocity through the motor.
    Cruise(Vec3),
    /// Unbound input.
    Noop,
}

impl Action {
    /// Default key map: w/s throttle, a/d steer, space jump, x brake.
    pub fn from_key(key: &str) -> Self {
        match key {
            "w" | "W" => Self::Throttle(1.0),
            "s" | "S" => Self::Throttle(-1.0),
            "a" | "A" => Self::Steer(1.0),
            "d" | "D" => Self::Steer(-1.0),
            " " | "space" => Self::Jump,
            "x" | "X" => Self::Brake,
            _ => Self::Noop,
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, Self::Noop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driving_keys_map_to_signed_actions() {
        assert_eq!(Action::from_key("w"), Action::Throttle(1.0));
        assert_eq!(Action::from_key("S"), Action::Throttle(-1.0));
        assert_eq!(Action::from_key("a"), Action::Steer(1.0));
        assert_eq!(Action::from_key("d"), Action::Steer(-1.0));
    }

    #[test]
    fn space_and_brake() {
        assert_eq!(Action::from_key(" "), Action::Jump);
        assert_eq!(Action::from_key("space"), Action::Jump);
        assert_eq!(Action::from_key("x"), Action::Brake);
    }

    #[test]
    fn unbound_keys_are_noop() {
        assert!(Action::from_key("q").is_noop());
        assert!(Action::from_key("").is_noop());
    }
}
